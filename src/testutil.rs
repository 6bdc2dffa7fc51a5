//! Test fakes for the storage port.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::conf::StorageConfig;
use crate::storage::{
    BackendFactory, Configuration, Record, SqliteBackendFactory, StorageError, StoragePort,
};

/// Sqlite factory rooted in a fresh scratch dir. Keep the `TempDir` alive for
/// as long as the factory is in use.
pub fn temp_sqlite_factory() -> (TempDir, SqliteBackendFactory) {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..StorageConfig::default()
    };
    (dir, SqliteBackendFactory::new(&config))
}

/// In-memory storage port. Pattern matching supports a trailing `%`
/// wildcard; anything else is an exact match, which is all the harness
/// produces.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<i64, Record>>,
    poisoned: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, to exercise the
    /// backend-unavailable path mid-workload.
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("store poisoned".into()));
        }
        Ok(())
    }
}

impl StoragePort for MemoryStore {
    fn insert_batch(&self, records: &[Record]) -> Result<(), StorageError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        for record in records {
            rows.insert(record.id, record.clone());
        }
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> Result<Record, StorageError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        rows.get(&id).cloned().ok_or(StorageError::NotFound(id))
    }

    fn find_by_first_name(&self, pattern: &str) -> Result<Vec<Record>, StorageError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        let matches = |name: &str| match pattern.strip_suffix('%') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        };
        Ok(rows
            .values()
            .filter(|record| matches(&record.first_name))
            .cloned()
            .collect())
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        self.check()?;
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}

/// Factory that counts constructions per variant and keeps the built stores
/// reachable for inspection. Can force one variant to fail to open.
#[derive(Default)]
pub struct CountingFactory {
    fail_on: Option<Configuration>,
    built: Mutex<HashMap<Configuration, usize>>,
    stores: Mutex<HashMap<Configuration, Arc<MemoryStore>>>,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(configuration: Configuration) -> Self {
        Self {
            fail_on: Some(configuration),
            ..Self::default()
        }
    }

    pub fn built_count(&self, configuration: Configuration) -> usize {
        *self.built.lock().unwrap().get(&configuration).unwrap_or(&0)
    }

    pub fn store(&self, configuration: Configuration) -> Option<Arc<MemoryStore>> {
        self.stores.lock().unwrap().get(&configuration).cloned()
    }
}

impl BackendFactory for CountingFactory {
    fn open(&self, configuration: Configuration) -> Result<Arc<dyn StoragePort>, StorageError> {
        if self.fail_on == Some(configuration) {
            return Err(StorageError::Unavailable(format!(
                "forced failure for {}",
                configuration
            )));
        }
        *self.built.lock().unwrap().entry(configuration).or_insert(0) += 1;
        let store = Arc::new(MemoryStore::new());
        self.stores
            .lock()
            .unwrap()
            .insert(configuration, Arc::clone(&store));
        Ok(store)
    }
}

/// Factory handing out one shared store for every variant, for tests that
/// need a handle on the exact instance a workload runs against.
pub struct SharedStoreFactory {
    store: Arc<dyn StoragePort>,
}

impl SharedStoreFactory {
    pub fn new(store: Arc<dyn StoragePort>) -> Self {
        Self { store }
    }
}

impl BackendFactory for SharedStoreFactory {
    fn open(&self, _: Configuration) -> Result<Arc<dyn StoragePort>, StorageError> {
        Ok(Arc::clone(&self.store))
    }
}

#[derive(Default)]
struct GateState {
    started: u32,
    released: bool,
}

/// Memory store whose inserts block on a gate, so tests can cancel a
/// workload at a deterministic point instead of racing a sleep.
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<GateState>,
    cond: Condvar,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until at least one insert has entered the gate.
    pub fn wait_started(&self, timeout: Duration) -> bool {
        let gate = self.gate.lock().unwrap();
        let (gate, result) = self
            .cond
            .wait_timeout_while(gate, timeout, |g| g.started == 0)
            .unwrap();
        drop(gate);
        !result.timed_out()
    }

    pub fn release(&self) {
        self.gate.lock().unwrap().released = true;
        self.cond.notify_all();
    }
}

impl StoragePort for GatedStore {
    fn insert_batch(&self, records: &[Record]) -> Result<(), StorageError> {
        {
            let mut gate = self.gate.lock().unwrap();
            gate.started += 1;
            self.cond.notify_all();
            while !gate.released {
                gate = self.cond.wait(gate).unwrap();
            }
        }
        self.inner.insert_batch(records)
    }

    fn get_by_id(&self, id: i64) -> Result<Record, StorageError> {
        self.inner.get_by_id(id)
    }

    fn find_by_first_name(&self, pattern: &str) -> Result<Vec<Record>, StorageError> {
        self.inner.find_by_first_name(pattern)
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        self.inner.delete_all()
    }
}
