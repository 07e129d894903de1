//! The legacy account store, as seen by the retry re-drive.

use std::collections::HashMap;

use account_directory_types::Account;
use parking_lot::RwLock;
use snafu::Snafu;
use uuid::Uuid;

/// Failure reported by a [`LegacyAccountSource`].
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("legacy store error: {message}"))]
pub struct LegacyError {
    /// Failure description.
    pub message: String,
}

/// Read access to the store accounts are migrated from.
///
/// Implementations block; the coordinator calls them from blocking worker threads.
pub trait LegacyAccountSource: Send + Sync {
    /// Loads the current state of an account, `None` if it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyError`] if the legacy store cannot be read.
    fn load(&self, uuid: Uuid) -> Result<Option<Account>, LegacyError>;
}

/// In-memory legacy store for tests and tooling.
#[derive(Debug, Default)]
pub struct InMemoryLegacySource {
    accounts: RwLock<HashMap<Uuid, Account>>,
    unavailable: RwLock<Option<String>>,
}

impl InMemoryLegacySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account.
    pub fn insert(&self, account: Account) {
        self.accounts.write().insert(account.uuid, account);
    }

    /// Removes an account, returning it if present.
    pub fn remove(&self, uuid: Uuid) -> Option<Account> {
        self.accounts.write().remove(&uuid)
    }

    /// Makes every load fail with `message` until [`Self::set_available`] is called.
    pub fn set_unavailable(&self, message: impl Into<String>) {
        *self.unavailable.write() = Some(message.into());
    }

    /// Lets loads succeed again.
    pub fn set_available(&self) {
        *self.unavailable.write() = None;
    }
}

impl LegacyAccountSource for InMemoryLegacySource {
    fn load(&self, uuid: Uuid) -> Result<Option<Account>, LegacyError> {
        if let Some(message) = self.unavailable.read().as_ref() {
            return Err(LegacyError { message: message.clone() });
        }
        Ok(self.accounts.read().get(&uuid).cloned())
    }
}
