//! Database layer for bloodlink.
//!
//! SQLite-backed key-document store. Every record lives as a JSON body in the
//! `documents` table, keyed by `(collection, id)`. Multi-document writes go
//! through [`Database::batch_write`], which commits all operations or none.

mod schema;
mod documents;
mod batches;
mod donors;
mod clinics;
mod requests;
mod appointments;
mod notifications;

pub use schema::*;
pub use documents::*;
pub use batches::*;
#[allow(unused_imports)]
pub use donors::*;
#[allow(unused_imports)]
pub use clinics::*;
#[allow(unused_imports)]
pub use requests::*;
#[allow(unused_imports)]
pub use appointments::*;
#[allow(unused_imports)]
pub use notifications::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::StoreSettings;

/// Collection names.
pub mod collections {
    pub const DONORS: &str = "donors";
    pub const CLINICS: &str = "clinics";
    pub const REQUESTS: &str = "requests";
    pub const APPOINTMENTS: &str = "appointments";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A conditional update found the guarded field in an unexpected state.
    #[error("Precondition failed on {collection}/{id}: field '{field}' changed")]
    PreconditionFailed {
        collection: String,
        id: String,
        field: String,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Default wait for a competing writer before giving up.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open the database described by the store settings.
    ///
    /// An empty path opens an in-memory database.
    pub fn open_with_settings(settings: &StoreSettings) -> DbResult<Self> {
        let db = if settings.path.is_empty() {
            Self::open_in_memory()?
        } else {
            Self::open(&settings.path)?
        };
        db.conn
            .busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::debug!("bloodlink schema initialized");
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"write_batches".to_string()));
    }

    #[test]
    fn test_open_with_settings_in_memory() {
        let settings = StoreSettings {
            path: String::new(),
            busy_timeout_ms: 250,
        };
        let db = Database::open_with_settings(&settings).unwrap();
        assert_eq!(db.batch_count().unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloodlink.db");

        let first = Database::open(&path).unwrap();
        first
            .set_document("clinics", "c1", &serde_json::json!({"name": "North"}))
            .unwrap();

        // Second handle sees the same data and re-running the schema is harmless
        let second = Database::open(&path).unwrap();
        assert!(second.get_document("clinics", "c1").unwrap().is_some());
    }
}
