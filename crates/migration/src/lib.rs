//! Online migration of accounts into the account directory.
//!
//! Migration copies accounts from a legacy store while steady-state traffic
//! keeps writing to the directory. It never takes locks; every write is a
//! conditional put that either lands or proves the row is already current.
//!
//! - [`MigrationCoordinator::migrate_batch`]: bounded-concurrency migration of
//!   a batch, closed by a tombstone sweep
//! - [`MigrationCoordinator::reconcile_tombstones`]: removes accounts deleted
//!   while migration was running
//! - [`MigrationCoordinator::redrive_retries`]: re-migrates UUIDs whose writes
//!   failed, reading current state from a [`LegacyAccountSource`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use account_directory_migration::{InMemoryLegacySource, MigrationCoordinator};
//! use account_directory_state::AccountDirectoryStore;
//! use account_directory_store::InMemoryBackend;
//! use account_directory_types::{Account, Uuid, config::DirectoryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let store = AccountDirectoryStore::new(backend, DirectoryConfig::default())?;
//! let coordinator = MigrationCoordinator::new(store);
//!
//! let batch = vec![Account::new(Uuid::new_v4(), "+14155550100").with_migration_version(1)];
//! let report = coordinator.migrate_batch(batch, 8).await?;
//! println!("migrated {} accounts", report.migrated);
//!
//! let legacy = Arc::new(InMemoryLegacySource::new());
//! coordinator.redrive_retries(legacy, None).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod coordinator;
mod error;
mod legacy;
pub mod metrics;

pub use coordinator::{MigrationBatchReport, MigrationCoordinator, RedriveReport};
pub use error::{MigrationError, Result};
pub use legacy::{InMemoryLegacySource, LegacyAccountSource, LegacyError};
