//! Test configuration helpers.
//!
//! Centralizes the configuration values tests use so they are not scattered
//! across test modules.

use account_directory_types::config::{
    BatchWriteConfig, DirectoryConfig, MigrationConfig, TableNames,
};

/// Returns a directory configuration suitable for tests.
///
/// Uses the production table names and retry ceiling so tests exercise the
/// same bounds as a deployment.
#[must_use]
pub fn test_directory_config() -> DirectoryConfig {
    DirectoryConfig {
        tables: TableNames::default(),
        batch_write: BatchWriteConfig::default(),
        migration: test_migration_config(),
    }
}

/// Returns a migration configuration suitable for tests.
///
/// - `default_worker_count`: 4 (exercises concurrency)
/// - `max_worker_count`: 16
/// - `redrive_batch_size`: 50
/// - `reconcile_page_size`: 10 (forces multi-page sweeps)
#[must_use]
pub fn test_migration_config() -> MigrationConfig {
    MigrationConfig {
        default_worker_count: 4,
        max_worker_count: 16,
        redrive_batch_size: 50,
        reconcile_page_size: 10,
    }
}

/// Directory configuration with a custom retry ceiling, for bulk-write tests.
#[bon::builder]
#[must_use]
pub fn test_batch_directory_config(
    #[builder(default = 25)] max_attempts: u32,
    #[builder(default = 25)] max_batch_size: usize,
) -> DirectoryConfig {
    DirectoryConfig {
        batch_write: BatchWriteConfig { max_attempts, max_batch_size },
        ..test_directory_config()
    }
}
