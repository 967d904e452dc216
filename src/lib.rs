//! # colmatch (library root)
//!
//! Semantic column matching: given a free-text phrase such as `"얼마를 기부했나요"`,
//! rank the columns of a small database catalog by how closely their
//! descriptions match it.
//!
//! - Embedding backends behind one trait ([`embedding`], [`sentence_embeddings`], [`hashing`]).
//! - Cosine scoring ([`similarity`]) and top-k ranking ([`ranker`]).
//! - The SQLite-backed column catalog ([`catalog`], [`models`], [`schema`], [`seed`]).
//! - The boundary operations and their payloads ([`service`], [`api`]).
//! - CLI parsing and configuration ([`commands`], [`config`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use colmatch::{
//!     catalog::CatalogStore,
//!     embedding::{EmbeddingGenerator, FallbackPolicy},
//!     hashing::HashingEmbedder,
//!     seed,
//!     service::ColumnMatchService,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = EmbeddingGenerator::new(Arc::new(HashingEmbedder::default()), FallbackPolicy::Propagate)?;
//! let catalog = CatalogStore::open("colmatch.db")?;
//! seed::seed_catalog(&catalog, &seed::default_donation_columns())?;
//!
//! let service = ColumnMatchService::new(Arc::new(generator), Arc::new(catalog));
//! service.update_embeddings().await?;
//! let response = service.get_candidates("기부 금액", 3).await?;
//! println!("{:?}", response.candidates);
//! # Ok(())
//! # }
//! ```

use directories::ProjectDirs;
use std::error::Error;

pub mod api;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod models;
pub mod ranker;
pub mod schema;
pub mod seed;
pub mod sentence_embeddings;
pub mod service;
pub mod similarity;

/// Return the per-platform configuration directory used by colmatch.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "awful-sec", "colmatch")`, so you get the right place on each OS
/// (e.g., `~/.config/colmatch` on Linux).
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = colmatch::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "awful-sec", "colmatch")
        .ok_or("Unable to determine config directory")?;
    let config_dir = proj_dirs.config_dir().to_path_buf();

    Ok(config_dir)
}
