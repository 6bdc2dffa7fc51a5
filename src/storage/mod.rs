//! Pluggable storage port the benchmark workloads run against.

mod registry;
mod sqlite;

use std::fmt;

use thiserror::Error;

pub use registry::{BackendFactory, BackendRegistry};
pub use sqlite::{SqliteBackendFactory, SqliteStore};

/// One synthetic person row, as persisted by the backend.
///
/// Records are generated in bulk, inserted, queried and bulk-deleted; they are
/// never mutated after generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub height: f64,
    pub weight: f64,
    pub cv_info: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum StorageError {
    #[error("no record with id {0}")]
    NotFound(i64),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Backend variant under test. Each variant routes to its own long-lived
/// store instance with entirely separate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Configuration {
    Plain,
    Encrypted,
    EncryptedMemoryScrubbed,
}

impl Configuration {
    /// Comparative-mode execution order; `Plain` is the baseline.
    pub const ALL: [Configuration; 3] = [
        Configuration::Plain,
        Configuration::Encrypted,
        Configuration::EncryptedMemoryScrubbed,
    ];

    pub fn db_file_name(&self) -> &'static str {
        match self {
            Configuration::Plain => "not-encrypted.db",
            Configuration::Encrypted => "encrypted.db",
            Configuration::EncryptedMemoryScrubbed => "encrypted-with-mem.db",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Configuration::Plain => "plain",
            Configuration::Encrypted => "encrypted",
            Configuration::EncryptedMemoryScrubbed => "encrypted+memory-security",
        };
        write!(f, "{}", name)
    }
}

/// Narrow data-access contract the harness measures through.
///
/// All operations are synchronous; the harness does its own timing and
/// batching around them.
pub trait StoragePort: Send + Sync {
    /// Insert a batch of records, replacing existing rows with the same id.
    fn insert_batch(&self, records: &[Record]) -> Result<(), StorageError>;

    /// Point lookup by id. Fails with `NotFound` if absent.
    fn get_by_id(&self, id: i64) -> Result<Record, StorageError>;

    /// Pattern match on the (unindexed) first-name column.
    fn find_by_first_name(&self, pattern: &str) -> Result<Vec<Record>, StorageError>;

    /// Drop every row.
    fn delete_all(&self) -> Result<(), StorageError>;
}
