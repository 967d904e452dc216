//! # Database models
//!
//! Data structures that map to the column catalog's SQLite schema via **Diesel**.
//!
//! - [`ColumnDescription`]: a table/column pair plus the synonym phrases that
//!   describe it.
//! - [`ColumnEmbedding`]: the derived vector for one description, stored as a
//!   `bincode` blob.
//!
//! ## Diesel expectations
//!
//! This module assumes the following tables exist (see `crate::schema`; they are
//! created on demand by [`CatalogStore::open`](crate::catalog::CatalogStore::open)):
//!
//! - `column_descriptions`
//! - `column_embeddings` (`column_id` references `column_descriptions.id`
//!   with `ON DELETE CASCADE`)
//!
//! Insert-side structs ([`NewColumnDescription`], [`NewColumnEmbedding`]) are kept
//! separate from the row structs so the database assigns ids.
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::embedding::{EMBEDDING_DIM, validate_vector};
use crate::error::StoreError;
use crate::schema::{column_descriptions, column_embeddings};

/// Human-readable synonyms for one table/column pair.
///
/// ### Table
/// - `column_descriptions`
///
/// ### Notes
/// - `description` is one or more comma-separated phrases, e.g.
///   `"기부 금액, 후원 금액"`. The whole string is embedded as one text.
#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = column_descriptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ColumnDescription {
    /// Auto-increment primary key.
    pub id: i32,
    pub table_name: String,
    pub column_name: String,
    pub description: String,
    /// UTC creation time.
    pub created_at: NaiveDateTime,
}

impl ColumnDescription {
    /// The synonym phrases, trimmed, with empty entries dropped.
    pub fn synonyms(&self) -> impl Iterator<Item = &str> {
        self.description
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Insert form of [`ColumnDescription`].
///
/// Also the shape of one entry in a YAML seed file.
#[derive(Insertable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = column_descriptions)]
pub struct NewColumnDescription {
    pub table_name: String,
    pub column_name: String,
    pub description: String,
    #[serde(skip, default = "now")]
    pub created_at: NaiveDateTime,
}

impl NewColumnDescription {
    pub fn new(table_name: &str, column_name: &str, description: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            description: description.to_string(),
            created_at: now(),
        }
    }

    /// All three text fields must be non-empty after trimming.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (field, value) in [
            ("table_name", &self.table_name),
            ("column_name", &self.column_name),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::InvalidDescription(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Stored vector for one [`ColumnDescription`].
///
/// ### Table
/// - `column_embeddings`
///
/// ### Associations
/// - `belongs_to(ColumnDescription)` through `column_id`
#[derive(Queryable, Identifiable, Selectable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(ColumnDescription, foreign_key = column_id))]
#[diesel(table_name = column_embeddings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ColumnEmbedding {
    pub id: i32,
    pub column_id: i32,
    /// `bincode`-encoded `Vec<f32>`; use [`ColumnEmbedding::vector`].
    pub embedding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

impl ColumnEmbedding {
    /// Decode and validate the stored vector.
    pub fn vector(&self) -> Result<Vec<f32>, StoreError> {
        let vector = decode_vector(&self.embedding)?;
        validate_vector(&vector, EMBEDDING_DIM).map_err(|source| StoreError::InvalidEmbedding {
            column_id: self.column_id,
            source,
        })?;
        Ok(vector)
    }
}

/// Insert form of [`ColumnEmbedding`].
#[derive(Insertable, Debug)]
#[diesel(table_name = column_embeddings)]
pub struct NewColumnEmbedding {
    pub column_id: i32,
    pub embedding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

impl NewColumnEmbedding {
    /// Validate `vector` and encode it for storage.
    pub fn new(column_id: i32, vector: &[f32]) -> Result<Self, StoreError> {
        validate_vector(vector, EMBEDDING_DIM)
            .map_err(|source| StoreError::InvalidEmbedding { column_id, source })?;
        Ok(Self {
            column_id,
            embedding: encode_vector(vector)?,
            created_at: now(),
        })
    }
}

pub fn encode_vector(vector: &[f32]) -> Result<Vec<u8>, StoreError> {
    bincode::serde::encode_to_vec(vector, bincode::config::standard())
        .map_err(|e| StoreError::Codec(e.to_string()))
}

pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    let (vector, read): (Vec<f32>, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| StoreError::Codec(e.to_string()))?;
    if read != bytes.len() {
        return Err(StoreError::Codec(format!(
            "{} trailing bytes after embedding",
            bytes.len() - read
        )));
    }
    Ok(vector)
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;

    #[test]
    fn test_vector_blob_round_trip() {
        let v: Vec<f32> = (0..EMBEDDING_DIM).map(|i| i as f32 * 0.25 - 3.0).collect();
        let row = NewColumnEmbedding::new(1, &v).unwrap();
        assert_eq!(decode_vector(&row.embedding).unwrap(), v);
    }

    #[test]
    fn test_wrong_shape_is_rejected_before_encoding() {
        let err = NewColumnEmbedding::new(9, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidEmbedding {
                column_id: 9,
                source: EmbeddingError::DimensionMismatch { .. }
            }
        ));

        let mut v = vec![0.1; EMBEDDING_DIM];
        v[0] = f32::INFINITY;
        assert!(NewColumnEmbedding::new(9, &v).is_err());
    }

    #[test]
    fn test_stored_blob_is_validated_on_read() {
        let row = ColumnEmbedding {
            id: 1,
            column_id: 4,
            embedding: encode_vector(&[1.0; 10]).unwrap(),
            created_at: now(),
        };
        assert!(matches!(
            row.vector(),
            Err(StoreError::InvalidEmbedding { column_id: 4, .. })
        ));

        let garbage = ColumnEmbedding {
            embedding: vec![0xff; 3],
            ..row
        };
        assert!(matches!(garbage.vector(), Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_description_validation_and_synonyms() {
        assert!(NewColumnDescription::new("donations", "amount", "기부 금액").validate().is_ok());
        assert!(NewColumnDescription::new(" ", "amount", "x").validate().is_err());
        assert!(NewColumnDescription::new("t", "c", "  ").validate().is_err());

        let d = ColumnDescription {
            id: 1,
            table_name: "donations".into(),
            column_name: "amount".into(),
            description: "기부 금액, 후원 금액, ,기부액".into(),
            created_at: now(),
        };
        assert_eq!(d.synonyms().collect::<Vec<_>>(), ["기부 금액", "후원 금액", "기부액"]);
    }
}
