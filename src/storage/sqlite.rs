use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::conf::StorageConfig;
use crate::storage::{BackendFactory, Configuration, Record, StorageError, StoragePort};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS person (
    id INTEGER PRIMARY KEY,
    first_name TEXT,
    last_name TEXT,
    height REAL,
    weight REAL,
    cv_info TEXT
)";

const SELECT_COLUMNS: &str = "id, first_name, last_name, height, weight, cv_info";

/// SQLite-backed store, optionally keyed with SQLCipher.
///
/// The connection sits behind a mutex because the port must be shareable
/// across worker threads; the orchestrator only ever runs one workload at a
/// time, so the lock is uncontended.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file. With `key` set the database is keyed
    /// via SQLCipher before any other statement, and page scrubbing is
    /// toggled through `cipher_memory_security`.
    pub fn open(
        path: &Path,
        key: Option<&str>,
        memory_security: bool,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        if let Some(key) = key {
            conn.pragma_update(None, "key", key)?;
            conn.pragma_update(
                None,
                "cipher_memory_security",
                if memory_security { "ON" } else { "OFF" },
            )?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Unencrypted in-memory database, handy for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        height: row.get(3)?,
        weight: row.get(4)?,
        cv_info: row.get(5)?,
    })
}

impl StoragePort for SqliteStore {
    fn insert_batch(&self, records: &[Record]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().expect("sqlite connection poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO person (id, first_name, last_name, height, weight, cv_info)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.id,
                    record.first_name,
                    record.last_name,
                    record.height,
                    record.weight,
                    record.cv_info,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> Result<Record, StorageError> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM person WHERE id = ?1",
            SELECT_COLUMNS
        ))?;
        stmt.query_row(params![id], row_to_record)
            .optional()?
            .ok_or(StorageError::NotFound(id))
    }

    fn find_by_first_name(&self, pattern: &str) -> Result<Vec<Record>, StorageError> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM person WHERE first_name LIKE ?1",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        conn.execute("DELETE FROM person", [])?;
        Ok(())
    }
}

/// Opens one database file per backend variant under the configured data dir.
pub struct SqliteBackendFactory {
    data_dir: PathBuf,
    passphrase: String,
}

impl SqliteBackendFactory {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            passphrase: config.passphrase.clone(),
        }
    }
}

impl BackendFactory for SqliteBackendFactory {
    fn open(&self, configuration: Configuration) -> Result<Arc<dyn StoragePort>, StorageError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Unavailable(format!("creating data dir: {}", e)))?;
        let path = self.data_dir.join(configuration.db_file_name());
        let (key, memory_security) = match configuration {
            Configuration::Plain => (None, false),
            Configuration::Encrypted => (Some(self.passphrase.as_str()), false),
            Configuration::EncryptedMemoryScrubbed => (Some(self.passphrase.as_str()), true),
        };
        let store = SqliteStore::open(&path, key, memory_security)?;
        Ok(Arc::new(store))
    }
}
