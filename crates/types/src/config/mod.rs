//! Configuration types for the account directory.
//!
//! All config structs validate their values at construction time via
//! fallible builders. Post-deserialization validation is available via
//! the `validate()` method on each struct. Loading from files or the
//! environment is left to the embedding service.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// expansions.
#![allow(clippy::unwrap_used)]

mod migration;
mod storage;

pub use migration::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
pub use storage::*;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

impl ConfigError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> crate::ErrorCode {
        crate::ErrorCode::ConfigValidation
    }
}

/// Top-level directory configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryConfig {
    /// Backend table names.
    #[serde(default)]
    pub tables: TableNames,
    /// Bulk write retry settings.
    #[serde(default)]
    pub batch_write: BatchWriteConfig,
    /// Migration worker settings.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl DirectoryConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Validation`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tables.validate()?;
        self.batch_write.validate()?;
        self.migration.validate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // =========================================================================
    // TableNames
    // =========================================================================

    #[test]
    fn test_table_names_defaults_are_valid() {
        let tables = TableNames::builder().build().expect("defaults should be valid");
        assert_eq!(tables.accounts, "accounts");
        assert_eq!(tables.logins, "accounts_logins");
        assert_eq!(tables, TableNames::default());
    }

    #[test]
    fn test_table_names_reject_empty() {
        let err = TableNames::builder().misc(String::new()).build().unwrap_err();
        assert!(err.to_string().contains("misc"));
    }

    #[test]
    fn test_table_names_reject_duplicates() {
        let err = TableNames::builder()
            .tombstones("queue".to_string())
            .retries("queue".to_string())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("tombstones"));
        assert!(err.to_string().contains("retries"));
    }

    // =========================================================================
    // BatchWriteConfig
    // =========================================================================

    #[test]
    fn test_batch_write_defaults() {
        let config = BatchWriteConfig::builder().build().expect("defaults");
        assert_eq!(config.max_attempts, 25);
        assert_eq!(config.max_batch_size, 25);
    }

    #[test]
    fn test_batch_write_size_bounds() {
        assert!(BatchWriteConfig::builder().max_batch_size(1).build().is_ok());
        assert!(BatchWriteConfig::builder().max_batch_size(0).build().is_err());
        let err = BatchWriteConfig::builder().max_batch_size(26).build().unwrap_err();
        assert!(err.to_string().contains("max_batch_size"));
    }

    #[test]
    fn test_batch_write_requires_an_attempt() {
        assert!(BatchWriteConfig::builder().max_attempts(0).build().is_err());
    }

    // =========================================================================
    // MigrationConfig
    // =========================================================================

    #[test]
    fn test_migration_defaults() {
        let config = MigrationConfig::builder().build().expect("defaults");
        assert_eq!(config.default_worker_count, 1);
        assert_eq!(config.max_worker_count, 64);
    }

    #[test]
    fn test_migration_default_exceeds_max() {
        let err = MigrationConfig::builder()
            .default_worker_count(10)
            .max_worker_count(4)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("default_worker_count"));
    }

    #[test]
    fn test_migration_rejects_zero() {
        assert!(MigrationConfig::builder().redrive_batch_size(0).build().is_err());
    }

    #[test]
    fn test_clamp_worker_count() {
        let config = MigrationConfig::builder().max_worker_count(8).build().unwrap();
        assert_eq!(config.clamp_worker_count(0), 1);
        assert_eq!(config.clamp_worker_count(4), 4);
        assert_eq!(config.clamp_worker_count(100), 8);
    }

    // =========================================================================
    // DirectoryConfig
    // =========================================================================

    #[test]
    fn test_directory_config_deserializes_with_defaults() {
        let config: DirectoryConfig =
            serde_json::from_str(r#"{"migration":{"max_worker_count":16}}"#).unwrap();
        assert_eq!(config.migration.max_worker_count, 16);
        assert_eq!(config.batch_write, BatchWriteConfig::default());
        config.validate().expect("valid");
    }

    #[test]
    fn test_directory_config_validate_catches_bad_section() {
        let mut config = DirectoryConfig::default();
        config.batch_write.max_batch_size = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_directory_config_schema_lists_sections() {
        let schema = schemars::schema_for!(DirectoryConfig);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("batch_write"));
        assert!(json.contains("tables"));
    }
}
