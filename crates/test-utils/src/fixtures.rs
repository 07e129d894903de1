//! Directory fixtures backed by in-memory tables.

// Fixtures are expected to panic on invalid setup.
#![allow(clippy::expect_used)]

use std::sync::Arc;

use account_directory_state::{
    AccountDirectoryStore,
    schema::{ATTR_LOGIN, ATTR_MISC_NAME, ATTR_UUID},
};
use account_directory_store::InMemoryBackend;
use account_directory_types::config::{DirectoryConfig, TableNames};

use crate::{config::test_directory_config, fault_injector::FaultInjectingBackend};

/// Registers every directory table on `backend` with its partition key.
pub fn create_tables(backend: &InMemoryBackend, tables: &TableNames) {
    backend.create_table(&tables.accounts, ATTR_UUID);
    backend.create_table(&tables.logins, ATTR_LOGIN);
    backend.create_table(&tables.misc, ATTR_MISC_NAME);
    backend.create_table(&tables.tombstones, ATTR_UUID);
    backend.create_table(&tables.retries, ATTR_UUID);
}

/// An [`AccountDirectoryStore`] over a fault-injecting in-memory backend.
///
/// # Example
///
/// ```
/// use account_directory_test_utils::TestDirectory;
/// use account_directory_types::{Account, Uuid};
///
/// let dir = TestDirectory::new();
/// let mut account = Account::new(Uuid::new_v4(), "+14155550100");
/// assert!(dir.store.create(&mut account, 1).unwrap());
/// assert_eq!(dir.row_count(&dir.config().tables.logins), 1);
/// ```
pub struct TestDirectory {
    /// The backend every table is wired to.
    pub backend: Arc<FaultInjectingBackend>,
    /// The directory under test.
    pub store: AccountDirectoryStore,
}

impl TestDirectory {
    /// Creates a directory with [`test_directory_config`].
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_directory_config())
    }

    /// Creates a directory with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    #[must_use]
    pub fn with_config(config: DirectoryConfig) -> Self {
        let memory = Arc::new(InMemoryBackend::new());
        create_tables(&memory, &config.tables);
        let backend = Arc::new(FaultInjectingBackend::new(memory));
        let store =
            AccountDirectoryStore::new(backend.clone(), config).expect("valid test config");
        Self { backend, store }
    }

    /// Returns the directory configuration.
    pub fn config(&self) -> &DirectoryConfig {
        self.store.config()
    }

    /// Returns the in-memory tables, bypassing fault injection.
    pub fn memory(&self) -> &InMemoryBackend {
        self.backend.inner()
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.memory().item_count(table)
    }
}

impl Default for TestDirectory {
    fn default() -> Self {
        Self::new()
    }
}
