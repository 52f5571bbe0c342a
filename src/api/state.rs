//! Application state for the payroll engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::calculation::{Clock, SalaryComputer};
use crate::config::ConfigLoader;
use crate::error::EngineResult;
use crate::import::ImportService;
use crate::store::{InMemoryStore, PersistenceStore};

/// Shared application state.
///
/// The store has a single owner behind a mutex; every command locks it for
/// its whole duration, so commands never interleave their transactions.
#[derive(Clone)]
pub struct AppState {
    /// The loaded payroll configuration.
    config: Arc<ConfigLoader>,
    store: Arc<Mutex<InMemoryStore>>,
    computer: SalaryComputer,
    importer: ImportService,
}

impl AppState {
    /// Creates a new application state over a seeded store.
    pub fn new(config: ConfigLoader, store: InMemoryStore) -> Self {
        let computer =
            SalaryComputer::new(config.tax_table().clone(), config.settings().clone());
        let importer = ImportService::new(config.headers().clone());
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            computer,
            importer,
        }
    }

    /// Replaces the clock salary records are timestamped with.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.computer = self.computer.with_clock(clock);
        self
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the salary computer.
    pub fn computer(&self) -> &SalaryComputer {
        &self.computer
    }

    /// Returns the import service.
    pub fn importer(&self) -> &ImportService {
        &self.importer
    }

    /// Returns a handle to the shared store.
    pub fn store(&self) -> Arc<Mutex<InMemoryStore>> {
        Arc::clone(&self.store)
    }

    /// Runs `work` with exclusive access to the store.
    ///
    /// If an earlier command panicked while holding the store, the
    /// transaction it left open is rolled back before `work` runs.
    pub fn with_store<T>(
        &self,
        work: impl FnOnce(&mut InMemoryStore) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => {
                let mut store = poisoned.into_inner();
                let open = store.in_transaction();
                warn!(
                    open_transaction = open,
                    "Store lock poisoned by a panicked command, recovering"
                );
                if open {
                    store.rollback()?;
                }
                self.store.clear_poison();
                store
            }
        };
        work(&mut store)
    }
}
