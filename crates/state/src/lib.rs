//! Account directory state over a key-value backend.
//!
//! This crate sits between the backend contract (`account-directory-store`)
//! and the migration subsystem (`account-directory-migration`), providing:
//!
//! - [`AccountDirectoryStore`]: create / get / update / delete over two tables
//! - [`AccountTable`]: UUID-keyed account rows with migration-version guards
//! - [`LoginUniquenessIndex`]: login → UUID bindings, one UUID per login
//! - [`DirectoryVersionCounter`]: membership-change counter
//! - [`TombstoneQueue`] and [`RetryQueue`]: side-tables drained by migration
//! - [`BatchWriteExecutor`]: bulk writes with bounded retry of unprocessed items
//!
//! Steady-state operations are synchronous single-item writes. Correctness
//! rests on the backend's per-item conditional writes; nothing here locks.

#![deny(unsafe_code)]

mod account_table;
mod batch;
mod counter;
mod directory;
mod error;
mod login_index;
pub mod metrics;
mod queues;
pub mod schema;

pub use account_table::AccountTable;
pub use batch::{BatchWriteExecutor, BatchWriteOutcome};
pub use counter::DirectoryVersionCounter;
pub use directory::{AccountDirectoryStore, DeleteOptions};
pub use error::{DirectoryError, Result};
pub use login_index::{LoginClaim, LoginUniquenessIndex};
pub use queues::{RetryQueue, TombstoneQueue};
