//! Migration worker and reconciliation configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration for bulk migration, retry re-drive, and tombstone sweeps.
///
/// # Validation Rules
///
/// - All values must be > 0
/// - `default_worker_count` must be <= `max_worker_count`
///
/// # Example
///
/// ```no_run
/// # use account_directory_types::config::MigrationConfig;
/// let config = MigrationConfig::builder()
///     .default_worker_count(8)
///     .max_worker_count(32)
///     .build()
///     .expect("valid migration config");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationConfig {
    /// Worker width used when a caller does not pick one.
    #[serde(default = "default_worker_count")]
    pub default_worker_count: usize,
    /// Upper bound on per-batch worker width; larger requests are clamped.
    #[serde(default = "default_max_worker_count")]
    pub max_worker_count: usize,
    /// Retry-queue entries read per re-drive pass.
    #[serde(default = "default_redrive_batch_size")]
    pub redrive_batch_size: usize,
    /// Tombstones read per scan page during reconciliation.
    #[serde(default = "default_reconcile_page_size")]
    pub reconcile_page_size: usize,
}

#[bon::bon]
impl MigrationConfig {
    /// Creates a new migration configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a value is zero or the default
    /// worker count exceeds the maximum.
    #[builder]
    pub fn new(
        #[builder(default = default_worker_count())] default_worker_count: usize,
        #[builder(default = default_max_worker_count())] max_worker_count: usize,
        #[builder(default = default_redrive_batch_size())] redrive_batch_size: usize,
        #[builder(default = default_reconcile_page_size())] reconcile_page_size: usize,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { default_worker_count, max_worker_count, redrive_batch_size, reconcile_page_size };
        config.validate()?;
        Ok(config)
    }
}

impl MigrationConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("default_worker_count", self.default_worker_count),
            ("max_worker_count", self.max_worker_count),
            ("redrive_batch_size", self.redrive_batch_size),
            ("reconcile_page_size", self.reconcile_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation { message: format!("{field} must be > 0") });
            }
        }
        if self.default_worker_count > self.max_worker_count {
            return Err(ConfigError::Validation {
                message: format!(
                    "default_worker_count ({}) must be <= max_worker_count ({})",
                    self.default_worker_count, self.max_worker_count
                ),
            });
        }
        Ok(())
    }

    /// Clamps a requested worker width into `1..=max_worker_count`.
    pub fn clamp_worker_count(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_worker_count)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_worker_count: default_worker_count(),
            max_worker_count: default_max_worker_count(),
            redrive_batch_size: default_redrive_batch_size(),
            reconcile_page_size: default_reconcile_page_size(),
        }
    }
}

fn default_worker_count() -> usize {
    1
}

fn default_max_worker_count() -> usize {
    64
}

fn default_redrive_batch_size() -> usize {
    100
}

fn default_reconcile_page_size() -> usize {
    100
}
