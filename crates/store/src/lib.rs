//! Local question store.
//!
//! Keeps the last known state of every question we care about, its owner,
//! and the chat message it was mirrored to. Backed by a single SQLite file.

pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

pub use error::StoreError;
pub use models::{ChatLink, QuestionRecord, UpsertOutcome, UserRecord};

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run(&conn)?;

        info!(path = %path.display(), "Store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        f(&mut conn)
    }
}
