//! # Seed data
//!
//! Loads column descriptions into the catalog. Seeding replaces the whole
//! description set; stale embeddings disappear with their descriptions, so run
//! `update-embeddings` afterwards.
//!
//! A seed file is YAML:
//!
//! ```yaml
//! columns:
//!   - table_name: donations
//!     column_name: amount
//!     description: "기부 금액, 후원 금액, 기부액"
//!   - table_name: donations
//!     column_name: donor_name
//!     description: "기부자 이름, 후원자 이름"
//! ```

use std::{error::Error, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::CatalogStore;
use crate::error::StoreError;
use crate::models::NewColumnDescription;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SeedFile {
    pub columns: Vec<NewColumnDescription>,
}

/// The built-in donation catalog: ten `donations` columns, each with Korean
/// synonym phrases.
pub fn default_donation_columns() -> Vec<NewColumnDescription> {
    [
        (
            "amount",
            "기부 금액, 후원 금액, 기부액, 후원액, 기부비, 후원비, 기부자금, 후원자금, 기부규모, 후원규모, 기부 총액, 후원 총액",
        ),
        (
            "donor_name",
            "기부자 이름, 후원자 이름, 기부자명, 후원자명, 기부자, 후원자, 기부자 성명, 후원자 성명, 기부자 정보, 후원자 정보",
        ),
        (
            "donation_date",
            "기부 날짜, 후원 날짜, 기부일, 후원일, 기부 시점, 후원 시점, 기부 일자, 후원 일자, 기부 시간, 후원 시간",
        ),
        (
            "purpose",
            "기부 목적, 후원 목적, 기부 용도, 후원 용도, 기부 취지, 후원 취지, 기부 방향, 후원 방향, 기부 의도, 후원 의도",
        ),
        (
            "status",
            "기부 상태, 후원 상태, 기부 진행상황, 후원 진행상황, 기부 단계, 후원 단계, 기부 현황, 후원 현황, 기부 상태값, 후원 상태값",
        ),
        (
            "category",
            "기부 분야, 후원 분야, 기부 카테고리, 후원 카테고리, 기부 영역, 후원 영역, 기부 부문, 후원 부문, 기부 유형, 후원 유형",
        ),
        (
            "target_amount",
            "목표 금액, 목표 기부액, 목표 후원액, 목표 기부비, 목표 후원비, 목표 기부자금, 목표 후원자금, 목표 기부규모, 목표 후원규모",
        ),
        (
            "campaign_name",
            "기부 캠페인, 후원 캠페인, 기부 운동, 후원 운동, 기부 프로젝트, 후원 프로젝트, 기부 모금, 후원 모금, 기부 이벤트, 후원 이벤트",
        ),
        (
            "beneficiary",
            "수혜자, 기부 수혜자, 후원 수혜자, 기부 대상, 후원 대상, 기부 혜택자, 후원 혜택자, 기부 수혜 대상, 후원 수혜 대상, 기부 수혜 기관",
        ),
        (
            "payment_method",
            "결제 방법, 기부 결제방법, 후원 결제방법, 기부 결제수단, 후원 결제수단, 기부 결제방식, 후원 결제방식, 기부 결제 유형, 후원 결제 유형",
        ),
    ]
    .into_iter()
    .map(|(column, description)| NewColumnDescription::new("donations", column, description))
    .collect()
}

/// Read a YAML seed file.
pub fn load_seed_file(path: &Path) -> Result<Vec<NewColumnDescription>, Box<dyn Error>> {
    info!("Loading seed file: {}", path.display());
    let content = fs::read_to_string(path)?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    Ok(seed.columns)
}

/// Replace the catalog's descriptions with `columns`. Returns how many were stored.
pub fn seed_catalog(
    store: &CatalogStore,
    columns: &[NewColumnDescription],
) -> Result<usize, StoreError> {
    let inserted = store.replace_all_descriptions(columns)?;
    info!(inserted, "seeded column catalog");
    Ok(inserted)
}
