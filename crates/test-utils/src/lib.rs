//! Shared test utilities for the account directory crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDirectory`] - Directory store wired to fault-injectable in-memory tables
//! - [`FaultInjectingBackend`] - Backend wrapper that fails chosen operations
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`strategies`] - Proptest generators for accounts and operation sequences
//! - [`init_test_tracing`] - Log capture honoring `RUST_LOG`
//! - [`test_directory_config`] - Default directory configuration for tests

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod assertions;
pub use assertions::assert_eventually;

mod config;
pub use config::{test_batch_directory_config, test_directory_config, test_migration_config};

mod fault_injector;
pub use fault_injector::{FaultInjectingBackend, Operation};

mod fixtures;
pub use fixtures::{TestDirectory, create_tables};

mod logging;
pub use logging::init_test_tracing;

pub mod strategies;
