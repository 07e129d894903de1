//! Table naming and bulk-write configuration for the key-value backend.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Hard per-request item limit of the backend's batch-write API.
pub const BACKEND_MAX_BATCH_SIZE: usize = 25;

/// Names of the backend tables the directory reads and writes.
///
/// # Validation Rules
///
/// - Every name must be non-empty.
/// - Names must be pairwise distinct; two logical tables sharing a physical
///   table would let a login-index row shadow an account row.
///
/// # Example
///
/// ```no_run
/// # use account_directory_types::config::TableNames;
/// let tables = TableNames::builder()
///     .accounts("prod_accounts".to_string())
///     .logins("prod_accounts_logins".to_string())
///     .build()
///     .expect("valid table names");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableNames {
    /// Primary UUID-keyed account table.
    #[serde(default = "default_accounts_table")]
    pub accounts: String,
    /// Login → UUID uniqueness table.
    #[serde(default = "default_logins_table")]
    pub logins: String,
    /// Miscellaneous parameter table holding the directory version.
    #[serde(default = "default_misc_table")]
    pub misc: String,
    /// Deleted-account tombstone queue.
    #[serde(default = "default_tombstones_table")]
    pub tombstones: String,
    /// Migration-failure retry queue.
    #[serde(default = "default_retries_table")]
    pub retries: String,
}

#[bon::bon]
impl TableNames {
    /// Creates a new table-name configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a name is empty or two names collide.
    #[builder]
    pub fn new(
        #[builder(default = default_accounts_table())] accounts: String,
        #[builder(default = default_logins_table())] logins: String,
        #[builder(default = default_misc_table())] misc: String,
        #[builder(default = default_tombstones_table())] tombstones: String,
        #[builder(default = default_retries_table())] retries: String,
    ) -> Result<Self, ConfigError> {
        let config = Self { accounts, logins, misc, tombstones, retries };
        config.validate()?;
        Ok(config)
    }
}

impl TableNames {
    /// Returns `(field, name)` pairs for every table.
    pub fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("accounts", &self.accounts),
            ("logins", &self.logins),
            ("misc", &self.misc),
            ("tombstones", &self.tombstones),
            ("retries", &self.retries),
        ]
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a name is empty or two names collide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = self.all();
        for (i, (field, name)) in all.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::Validation {
                    message: format!("table name `{field}` must not be empty"),
                });
            }
            if let Some((other, _)) = all[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(ConfigError::Validation {
                    message: format!("tables `{field}` and `{other}` share the name {name:?}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            accounts: default_accounts_table(),
            logins: default_logins_table(),
            misc: default_misc_table(),
            tombstones: default_tombstones_table(),
            retries: default_retries_table(),
        }
    }
}

fn default_accounts_table() -> String {
    "accounts".to_string()
}

fn default_logins_table() -> String {
    "accounts_logins".to_string()
}

fn default_misc_table() -> String {
    "misc".to_string()
}

fn default_tombstones_table() -> String {
    "migration_deleted_accounts".to_string()
}

fn default_retries_table() -> String {
    "migration_retry_accounts".to_string()
}

/// Bounded-retry bulk write configuration.
///
/// # Validation Rules
///
/// - `max_attempts` must be >= 1
/// - `max_batch_size` must be 1-25 (the backend rejects larger batches)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchWriteConfig {
    /// Retry passes allowed for unprocessed items after the first request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Items per bulk request.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

#[bon::bon]
impl BatchWriteConfig {
    /// Creates a new batch-write configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a value is out of range.
    #[builder]
    pub fn new(
        #[builder(default = default_max_attempts())] max_attempts: u32,
        #[builder(default = default_max_batch_size())] max_batch_size: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_attempts, max_batch_size };
        config.validate()?;
        Ok(config)
    }
}

impl BatchWriteConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation {
                message: "max_attempts must be >= 1".to_string(),
            });
        }
        if self.max_batch_size == 0 || self.max_batch_size > BACKEND_MAX_BATCH_SIZE {
            return Err(ConfigError::Validation {
                message: format!(
                    "max_batch_size must be 1-{}, got {}",
                    BACKEND_MAX_BATCH_SIZE, self.max_batch_size
                ),
            });
        }
        Ok(())
    }
}

impl Default for BatchWriteConfig {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts(), max_batch_size: default_max_batch_size() }
    }
}

fn default_max_attempts() -> u32 {
    25
}

fn default_max_batch_size() -> usize {
    BACKEND_MAX_BATCH_SIZE
}
