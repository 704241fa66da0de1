//! Named JSON document store backed by SQLite.
//!
//! One row per document name. Saving an existing name overwrites its data and
//! timestamp in place; the id assigned on first insert never changes.
//!
//! All access goes through a single connection behind a mutex, and the write
//! itself is one `INSERT ... ON CONFLICT(name) DO UPDATE` statement, so
//! concurrent saves of one name always leave exactly one record. Saves run in
//! an immediate transaction that first reads the stored timestamp, so `time`
//! keeps increasing even when several processes share the database file.

pub mod size;

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;

use crate::error::{Error, Result};

pub use size::byte_count_si;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "files" (
    "id"    INTEGER NOT NULL,
    "time"  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    "data"  JSON NOT NULL,
    "name"  TEXT NOT NULL DEFAULT '' UNIQUE,
    PRIMARY KEY("id" AUTOINCREMENT)
);"#;

const UPSERT: &str = r#"
INSERT INTO files (data, name, time) VALUES (?1, ?2, ?3)
ON CONFLICT(name) DO UPDATE SET data = excluded.data, time = excluded.time
RETURNING id"#;

/// Metadata of one stored document. `size` is derived from the stored data on
/// every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    #[serde(rename = "last_updated")]
    pub time: DateTime<Utc>,
    pub name: String,
    pub size: String,
}

pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open (creating if needed) a file-backed store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.as_ref().display(), journal_mode = %mode, "opened document store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert `json` under `name`, or overwrite the existing document of that
    /// name. Returns the record id.
    pub fn save_file(&self, name: &str, json: &str) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let previous: Option<DateTime<Utc>> = tx
            .query_row("SELECT time FROM files WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        let time = next_timestamp(previous);
        let id: i64 = tx.query_row(UPSERT, params![json, name, time], |row| row.get(0))?;
        tx.commit()?;
        tracing::debug!(id, name, bytes = json.len(), "saved document");
        Ok(id)
    }

    /// Stored JSON text for `name`.
    pub fn get_file(&self, name: &str) -> Result<String> {
        self.conn
            .lock()
            .query_row("SELECT data FROM files WHERE name = ?1", [name], |row| row.get(0))
            .optional()?
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Metadata of every stored document, in id order.
    pub fn get_all(&self) -> Result<Vec<FileRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, time, name, length(CAST(data AS BLOB)) FROM files ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let len: i64 = row.get(3)?;
            Ok(FileRecord {
                id: row.get(0)?,
                time: row.get(1)?,
                name: row.get(2)?,
                size: byte_count_si(len.max(0) as u64),
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

// A document's new timestamp is always past its stored one, even if the wall
// clock is behind it.
fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + TimeDelta::milliseconds(1),
        _ => now,
    }
}
