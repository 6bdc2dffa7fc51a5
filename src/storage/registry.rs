use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;

use crate::storage::{Configuration, StorageError, StoragePort};

/// Builds the physical store for a backend variant. Called at most once per
/// variant for the lifetime of the registry.
pub trait BackendFactory: Send + Sync {
    fn open(&self, configuration: Configuration) -> Result<Arc<dyn StoragePort>, StorageError>;
}

/// Per-variant singleton registry for backend instances.
///
/// Stores are created lazily on first request and reused for the process
/// lifetime; the lock makes racy first requests safe (first caller wins,
/// later callers see the same instance).
pub struct BackendRegistry {
    factory: Box<dyn BackendFactory>,
    backends: Mutex<HashMap<Configuration, Arc<dyn StoragePort>>>,
}

impl BackendRegistry {
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            factory,
            backends: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, configuration: Configuration) -> Result<Arc<dyn StoragePort>, StorageError> {
        let mut backends = self.backends.lock().expect("backend registry poisoned");
        if let Some(store) = backends.get(&configuration) {
            return Ok(Arc::clone(store));
        }
        let store = self.factory.open(configuration)?;
        info!("opened backend '{}'", configuration);
        backends.insert(configuration, Arc::clone(&store));
        Ok(store)
    }
}
