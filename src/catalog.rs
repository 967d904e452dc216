//! # Column catalog store
//!
//! SQLite persistence for [`ColumnDescription`]s and their [`ColumnEmbedding`]s.
//!
//! The store keeps only the database URL. Every operation opens its own
//! `SqliteConnection`, turns on foreign keys (so deleting a description cascades
//! to its embedding) and sets a busy timeout. That keeps `CatalogStore` `Send + Sync`
//! and lets the service facade share it behind an `Arc` across blocking workers.
//!
//! ## Replacement semantics
//! [`CatalogStore::replace_all_embeddings`] validates every vector first, then
//! deletes the previous set and inserts the new one inside a single transaction.
//! A failure anywhere rolls back, so readers see either the old set or the new
//! one, never a mix.
//!
//! ```no_run
//! use colmatch::catalog::CatalogStore;
//! use colmatch::models::NewColumnDescription;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CatalogStore::open("colmatch.db")?;
//! store.insert_description(&NewColumnDescription::new("donations", "amount", "기부 금액"))?;
//! for (embedding, description) in store.list_embeddings()? {
//!     println!("{} -> {} bytes", description.column_name, embedding.embedding.len());
//! }
//! # Ok(()) }
//! ```

use std::collections::HashSet;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{
    ColumnDescription, ColumnEmbedding, NewColumnDescription, NewColumnEmbedding,
};
use crate::schema::{column_descriptions, column_embeddings};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS column_descriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    table_name VARCHAR(100) NOT NULL,
    column_name VARCHAR(100) NOT NULL,
    description TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_column_descriptions_table_name
    ON column_descriptions(table_name);
CREATE INDEX IF NOT EXISTS ix_column_descriptions_column_name
    ON column_descriptions(column_name);

CREATE TABLE IF NOT EXISTS column_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    column_id INTEGER NOT NULL
        REFERENCES column_descriptions(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    created_at TIMESTAMP NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_column_embeddings_column_id
    ON column_embeddings(column_id);
"#;

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

/// Handle to the column catalog database.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    database_url: String,
}

impl CatalogStore {
    /// Open the catalog at `database_url`, creating the tables if they are missing.
    ///
    /// # Errors
    /// Connection failures and DDL errors.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let store = Self {
            database_url: database_url.to_string(),
        };
        let mut conn = store.connect()?;
        conn.batch_execute(CREATE_TABLES)?;
        debug!(database_url, "column catalog schema ready");
        Ok(store)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let mut conn = SqliteConnection::establish(&self.database_url)?;
        conn.batch_execute(CONNECTION_PRAGMAS)?;
        Ok(conn)
    }

    /// Every description, in id order.
    pub fn list_descriptions(&self) -> Result<Vec<ColumnDescription>, StoreError> {
        let mut conn = self.connect()?;
        let rows = column_descriptions::table
            .order(column_descriptions::id.asc())
            .select(ColumnDescription::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Every embedding joined with the description it belongs to, in embedding id order.
    pub fn list_embeddings(
        &self,
    ) -> Result<Vec<(ColumnEmbedding, ColumnDescription)>, StoreError> {
        let mut conn = self.connect()?;
        let rows = column_embeddings::table
            .inner_join(column_descriptions::table)
            .order(column_embeddings::id.asc())
            .select((ColumnEmbedding::as_select(), ColumnDescription::as_select()))
            .load(&mut conn)?;
        Ok(rows)
    }

    /// Replace the whole embedding set with `pairs` of `(description id, vector)`.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    /// - [`StoreError::InvalidEmbedding`] if any vector has the wrong shape, or
    ///   [`StoreError::DuplicateEmbedding`] if a description id repeats; nothing
    ///   is touched in either case.
    /// - Query errors (for example an unknown description id); the transaction is
    ///   rolled back and the previous embeddings remain.
    pub fn replace_all_embeddings(&self, pairs: &[(i32, Vec<f32>)]) -> Result<usize, StoreError> {
        self.replace_embeddings(pairs, false)
    }

    /// Like [`replace_all_embeddings`](Self::replace_all_embeddings), but pairs whose
    /// description no longer exists are dropped (with a warning) instead of failing
    /// the whole replacement. The existence check runs inside the transaction.
    pub fn replace_current_embeddings(
        &self,
        pairs: &[(i32, Vec<f32>)],
    ) -> Result<usize, StoreError> {
        self.replace_embeddings(pairs, true)
    }

    fn replace_embeddings(
        &self,
        pairs: &[(i32, Vec<f32>)],
        skip_missing: bool,
    ) -> Result<usize, StoreError> {
        let mut seen = HashSet::with_capacity(pairs.len());
        if let Some((column_id, _)) = pairs.iter().find(|(id, _)| !seen.insert(*id)) {
            return Err(StoreError::DuplicateEmbedding {
                column_id: *column_id,
            });
        }
        let rows = pairs
            .iter()
            .map(|(column_id, vector)| NewColumnEmbedding::new(*column_id, vector))
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.connect()?;
        let (removed, inserted) = conn.transaction::<_, StoreError, _>(|conn| {
            let current: Option<HashSet<i32>> = if skip_missing {
                Some(
                    column_descriptions::table
                        .select(column_descriptions::id)
                        .load::<i32>(conn)?
                        .into_iter()
                        .collect(),
                )
            } else {
                None
            };

            let removed = diesel::delete(column_embeddings::table).execute(conn)?;
            let mut inserted = 0;
            for row in &rows {
                if let Some(ids) = &current {
                    if !ids.contains(&row.column_id) {
                        warn!(column_id = row.column_id, "description gone, skipping embedding");
                        continue;
                    }
                }
                inserted += diesel::insert_into(column_embeddings::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok((removed, inserted))
        })?;

        info!(removed, inserted, "replaced column embeddings");
        Ok(inserted)
    }

    /// Replace every description (and, by cascade, every embedding) with `new`.
    pub fn replace_all_descriptions(
        &self,
        new: &[NewColumnDescription],
    ) -> Result<usize, StoreError> {
        for description in new {
            description.validate()?;
        }

        let mut conn = self.connect()?;
        let inserted = conn.transaction::<_, StoreError, _>(|conn| {
            diesel::delete(column_descriptions::table).execute(conn)?;
            let mut inserted = 0;
            for description in new {
                inserted += diesel::insert_into(column_descriptions::table)
                    .values(description)
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;

        info!(inserted, "replaced column descriptions");
        Ok(inserted)
    }

    /// Insert one description and return the stored row.
    pub fn insert_description(
        &self,
        new: &NewColumnDescription,
    ) -> Result<ColumnDescription, StoreError> {
        new.validate()?;
        let mut conn = self.connect()?;
        let row = diesel::insert_into(column_descriptions::table)
            .values(new)
            .returning(ColumnDescription::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    /// Delete one description; its embedding goes with it. Returns rows deleted.
    pub fn delete_description(&self, id: i32) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let deleted =
            diesel::delete(column_descriptions::table.find(id)).execute(&mut conn)?;
        Ok(deleted)
    }

    pub fn count_descriptions(&self) -> Result<i64, StoreError> {
        let mut conn = self.connect()?;
        Ok(column_descriptions::table.count().get_result(&mut conn)?)
    }

    pub fn count_embeddings(&self) -> Result<i64, StoreError> {
        let mut conn = self.connect()?;
        Ok(column_embeddings::table.count().get_result(&mut conn)?)
    }
}
