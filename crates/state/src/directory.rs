//! Steady-state account directory operations.
//!
//! The directory composes two tables that are written separately, never in a
//! transaction:
//!
//! ```text
//! create(A, "x")                     delete(A)
//!   1. accounts[A]  cond: new or same login     1. tombstones[A]
//!   2. logins["x"]  cond: free or owned by A    2. logins["x"]   (if owned by A)
//!   3. misc[directory_version]                  3. accounts[A]
//!                                               4. misc[directory_version]
//! ```
//!
//! Every recovery path tolerates either write landing alone: a create that
//! loses the login race degrades to an update of the existing owner, and the
//! tombstone written first lets reconciliation finish an interrupted delete.

use std::{sync::Arc, time::Instant};

use account_directory_store::KvBackend;
use account_directory_types::{
    Account,
    config::{ConfigError, DirectoryConfig},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    account_table::AccountTable,
    batch::BatchWriteExecutor,
    counter::DirectoryVersionCounter,
    error::{DirectoryError, Result},
    login_index::{LoginClaim, LoginUniquenessIndex},
    metrics,
    queues::{RetryQueue, TombstoneQueue},
};

/// Options for [`AccountDirectoryStore::delete_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Append a tombstone before deleting.
    pub record_tombstone: bool,
    /// Directory version to store once the account is gone.
    pub directory_version: Option<i64>,
}

impl DeleteOptions {
    /// Steady-state delete: tombstone first, then advance the directory version.
    pub fn steady_state(directory_version: i64) -> Self {
        Self { record_tombstone: true, directory_version: Some(directory_version) }
    }

    /// Reconciliation delete: no tombstone, no version change.
    pub fn reconcile() -> Self {
        Self { record_tombstone: false, directory_version: None }
    }
}

/// The account directory facade.
///
/// Cloning is cheap; every clone shares the backend.
#[derive(Clone)]
pub struct AccountDirectoryStore {
    config: DirectoryConfig,
    accounts: AccountTable,
    logins: LoginUniquenessIndex,
    counter: DirectoryVersionCounter,
    tombstones: TombstoneQueue,
    retries: RetryQueue,
    executor: BatchWriteExecutor,
}

impl AccountDirectoryStore {
    /// Wires every table over `backend` using the names in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `config` is invalid.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        config: DirectoryConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let tables = &config.tables;
        let executor = BatchWriteExecutor::new(backend.clone(), config.batch_write);

        Ok(Self {
            accounts: AccountTable::new(backend.clone(), &tables.accounts),
            logins: LoginUniquenessIndex::new(backend.clone(), &tables.logins),
            counter: DirectoryVersionCounter::new(backend.clone(), &tables.misc),
            tombstones: TombstoneQueue::new(backend.clone(), executor.clone(), &tables.tombstones),
            retries: RetryQueue::new(backend, executor.clone(), &tables.retries),
            executor,
            config,
        })
    }

    /// Returns the configuration the store was built with.
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// The primary account table.
    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    /// The login uniqueness table.
    pub fn logins(&self) -> &LoginUniquenessIndex {
        &self.logins
    }

    /// The deleted-account tombstone queue.
    pub fn tombstones(&self) -> &TombstoneQueue {
        &self.tombstones
    }

    /// The migration retry queue.
    pub fn retries(&self) -> &RetryQueue {
        &self.retries
    }

    /// The bulk write executor shared by the queues.
    pub fn executor(&self) -> &BatchWriteExecutor {
        &self.executor
    }

    /// Creates an account. Returns `false` if `account.login` already belonged
    /// to another account, in which case `account.uuid` is rewritten to the
    /// existing owner and that owner is updated with this payload instead.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::IdentifierCollision` if `account.uuid` already
    /// holds a different login.
    /// Returns `DirectoryError::LoginOwnerMissing` if the login's owner has no
    /// account row.
    /// Returns `DirectoryError::Codec` or `DirectoryError::Backend` on storage failure.
    pub fn create(&self, account: &mut Account, directory_version: i64) -> Result<bool> {
        timed("create", || self.create_inner(account, directory_version))
    }

    fn create_inner(&self, account: &mut Account, directory_version: i64) -> Result<bool> {
        self.accounts.create(account)?;

        let owner = match self.logins.claim(&account.login, account.uuid)? {
            LoginClaim::Claimed => {
                self.counter.set(directory_version)?;
                debug!(uuid = %account.uuid, "Created account");
                return Ok(true);
            },
            LoginClaim::Owned { owner } => owner,
        };

        warn!(
            uuid = %account.uuid,
            owner = %owner,
            "Login already owned, updating existing account instead"
        );
        self.accounts.delete_if_login(account.uuid, &account.login)?;
        let owned = Account { uuid: owner, ..account.clone() };
        match self.accounts.update(&owned) {
            Err(DirectoryError::AccountNotFound { .. }) => {
                return Err(DirectoryError::LoginOwnerMissing { login: owned.login });
            },
            other => other?,
        }
        account.uuid = owner;
        // TODO: advance the directory version when the degraded create changes the
        // owner's discoverable_by_login flag.
        Ok(false)
    }

    /// Rewrites the payload and migration version of an existing account.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AccountNotFound` if the account does not exist.
    /// Returns `DirectoryError::Codec` or `DirectoryError::Backend` on storage failure.
    pub fn update(&self, account: &Account) -> Result<()> {
        timed("update", || self.accounts.update(account))
    }

    /// Looks up an account by login.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` or `DirectoryError::Codec` if a
    /// stored row cannot be restored.
    /// Returns `DirectoryError::Backend` if a read fails.
    pub fn get_by_login(&self, login: &str) -> Result<Option<Account>> {
        timed("get_by_login", || match self.logins.get(login)? {
            Some(uuid) => self.accounts.get(uuid),
            None => Ok(None),
        })
    }

    /// Looks up an account by UUID.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` or `DirectoryError::Codec` if
    /// the stored row cannot be restored.
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<Account>> {
        timed("get_by_uuid", || self.accounts.get(uuid))
    }

    /// Deletes an account, tombstoning it first and then storing
    /// `directory_version`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if any write fails.
    pub fn delete(&self, uuid: Uuid, directory_version: i64) -> Result<()> {
        self.delete_with(uuid, DeleteOptions::steady_state(directory_version))
    }

    /// Deletes an account with explicit tombstone and version behaviour.
    ///
    /// An absent account is a no-op apart from the tombstone, except that a
    /// login recorded in its retry entry is released if still bound to it.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if any write fails.
    pub fn delete_with(&self, uuid: Uuid, options: DeleteOptions) -> Result<()> {
        timed("delete", || {
            if options.record_tombstone {
                self.tombstones.put(uuid)?;
            }

            let Some(account) = self.accounts.get(uuid)? else {
                // A partial migration may have bound the login without the row.
                if let Some(login) = self.retries.login(uuid)? {
                    if self.logins.release(&login, uuid)? {
                        debug!(uuid = %uuid, "Released login of account with no row");
                    }
                }
                debug!(uuid = %uuid, "Delete of absent account");
                return Ok(());
            };

            if !self.logins.release(&account.login, uuid)? {
                debug!(uuid = %uuid, "Login not bound to deleted account");
            }
            self.accounts.delete(uuid)?;

            if let Some(version) = options.directory_version {
                self.counter.set(version)?;
            }
            debug!(uuid = %uuid, tombstone = options.record_tombstone, "Deleted account");
            Ok(())
        })
    }

    /// Returns the stored directory version.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptCounter` if the stored value is not numeric.
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn directory_version(&self) -> Result<Option<i64>> {
        self.counter.get()
    }
}

fn timed<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    metrics::record_operation(operation, start.elapsed().as_secs_f64());
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use account_directory_store::InMemoryBackend;
    use account_directory_types::Device;

    use super::*;

    fn store() -> (Arc<InMemoryBackend>, AccountDirectoryStore) {
        let config = DirectoryConfig::default();
        let backend = Arc::new(InMemoryBackend::new());
        backend.create_table(&config.tables.accounts, "U");
        backend.create_table(&config.tables.logins, "P");
        backend.create_table(&config.tables.misc, "PN");
        backend.create_table(&config.tables.tombstones, "U");
        backend.create_table(&config.tables.retries, "U");
        (backend.clone(), AccountDirectoryStore::new(backend, config).unwrap())
    }

    #[test]
    fn test_create_then_get() {
        let (_, store) = store();
        let mut account = Account::new(Uuid::new_v4(), "+14155550100");
        account.add_device(Device::new(1));

        assert!(store.create(&mut account, 1).unwrap());
        assert_eq!(store.get_by_uuid(account.uuid).unwrap(), Some(account.clone()));
        assert_eq!(store.get_by_login("+14155550100").unwrap(), Some(account));
        assert_eq!(store.directory_version().unwrap(), Some(1));
    }

    #[test]
    fn test_create_degrades_to_update_of_owner() {
        let (backend, store) = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(store.create(&mut Account::new(a, "x"), 1).unwrap());

        let mut second = Account::new(b, "x");
        second.data.profile_name = Some("second".into());
        assert!(!store.create(&mut second, 2).unwrap());

        assert_eq!(second.uuid, a);
        assert_eq!(store.logins().get("x").unwrap(), Some(a));
        assert_eq!(store.get_by_uuid(b).unwrap(), None);
        let owner = store.get_by_uuid(a).unwrap().unwrap();
        assert_eq!(owner.data.profile_name.as_deref(), Some("second"));
        assert_eq!(backend.item_count("accounts"), 1);
        assert_eq!(store.directory_version().unwrap(), Some(1));
    }

    #[test]
    fn test_create_with_colliding_uuid_fails() {
        let (_, store) = store();
        let uuid = Uuid::new_v4();
        store.create(&mut Account::new(uuid, "x"), 1).unwrap();

        let err = store.create(&mut Account::new(uuid, "y"), 2).unwrap_err();
        assert!(matches!(err, DirectoryError::IdentifierCollision { .. }));
        assert_eq!(store.logins().get("y").unwrap(), None);
    }

    #[test]
    fn test_degrade_with_missing_owner_row() {
        let (_, store) = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.logins().claim("x", a).unwrap();

        let mut account = Account::new(b, "x");
        let err = store.create(&mut account, 1).unwrap_err();
        assert!(matches!(err, DirectoryError::LoginOwnerMissing { ref login } if login == "x"));
        assert_eq!(account.uuid, b, "caller keeps its own UUID on failure");
        assert_eq!(store.get_by_uuid(a).unwrap(), None);

        // Retrying must not adopt the orphaned owner's UUID.
        assert!(store.create(&mut account, 2).is_err());
        assert_eq!(account.uuid, b);
        assert_eq!(store.get_by_uuid(a).unwrap(), None);
    }

    #[test]
    fn test_update_does_not_touch_directory_version() {
        let (_, store) = store();
        let mut account = Account::new(Uuid::new_v4(), "x");
        store.create(&mut account, 5).unwrap();

        account.data.avatar = Some("profiles/abc".into());
        store.update(&account).unwrap();

        assert_eq!(store.get_by_uuid(account.uuid).unwrap(), Some(account));
        assert_eq!(store.directory_version().unwrap(), Some(5));
    }

    #[test]
    fn test_update_missing_account() {
        let (_, store) = store();
        let err = store.update(&Account::new(Uuid::new_v4(), "x")).unwrap_err();
        assert!(matches!(err, DirectoryError::AccountNotFound { .. }));
    }

    #[test]
    fn test_delete_removes_rows_and_tombstones() {
        let (backend, store) = store();
        let mut account = Account::new(Uuid::new_v4(), "x");
        store.create(&mut account, 1).unwrap();

        store.delete(account.uuid, 2).unwrap();

        assert_eq!(store.get_by_uuid(account.uuid).unwrap(), None);
        assert_eq!(store.get_by_login("x").unwrap(), None);
        assert_eq!(store.tombstones().recently_deleted(10).unwrap(), vec![account.uuid]);
        assert_eq!(store.directory_version().unwrap(), Some(2));
        assert_eq!(backend.item_count("accounts_logins"), 0);
    }

    #[test]
    fn test_delete_absent_account_only_tombstones() {
        let (_, store) = store();
        let uuid = Uuid::new_v4();
        store.delete(uuid, 9).unwrap();

        assert_eq!(store.tombstones().recently_deleted(10).unwrap(), vec![uuid]);
        assert_eq!(store.directory_version().unwrap(), None);
    }

    #[test]
    fn test_reconcile_delete_skips_tombstone_and_version() {
        let (_, store) = store();
        let mut account = Account::new(Uuid::new_v4(), "x");
        store.create(&mut account, 1).unwrap();

        store.delete_with(account.uuid, DeleteOptions::reconcile()).unwrap();

        assert_eq!(store.get_by_uuid(account.uuid).unwrap(), None);
        assert!(store.tombstones().recently_deleted(10).unwrap().is_empty());
        assert_eq!(store.directory_version().unwrap(), Some(1));
    }

    #[test]
    fn test_delete_of_rowless_account_releases_retry_login() {
        let (_, store) = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.logins().migrate("x", a).unwrap();
        store.retries().put_with_login(a, "x").unwrap();

        store.delete(a, 2).unwrap();

        assert_eq!(store.logins().get("x").unwrap(), None);
        assert_eq!(store.directory_version().unwrap(), None);
        assert!(store.create(&mut Account::new(b, "x"), 3).unwrap());
    }

    #[test]
    fn test_delete_of_rowless_account_keeps_rebound_login() {
        let (_, store) = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.retries().put_with_login(a, "x").unwrap();
        store.create(&mut Account::new(b, "x"), 1).unwrap();

        store.delete(a, 2).unwrap();

        assert_eq!(store.logins().get("x").unwrap(), Some(b));
    }

    #[test]
    fn test_login_is_reusable_after_delete() {
        let (_, store) = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.create(&mut Account::new(a, "x"), 1).unwrap();
        store.delete(a, 2).unwrap();

        assert!(store.create(&mut Account::new(b, "x"), 3).unwrap());
        assert_eq!(store.get_by_login("x").unwrap().unwrap().uuid, b);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DirectoryConfig::default();
        config.batch_write.max_attempts = 0;
        let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
        assert!(AccountDirectoryStore::new(backend, config).is_err());
    }
}
