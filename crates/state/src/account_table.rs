//! UUID-keyed account rows.

use std::sync::Arc;

use account_directory_store::{
    AttributeValue, Condition, DeleteItem, GetItem, Item, KvBackend, KvError, PutItem, UpdateItem,
};
use account_directory_types::{Account, encode_payload};
use snafu::ResultExt;
use uuid::Uuid;

use crate::{
    error::{BackendSnafu, CodecSnafu, DirectoryError, Result},
    schema::{
        ATTR_DATA, ATTR_LOGIN, ATTR_UUID, ATTR_VERSION, account_from_item, account_item, uuid_key,
    },
};

/// The primary account table.
#[derive(Clone)]
pub struct AccountTable {
    backend: Arc<dyn KvBackend>,
    table: String,
}

impl AccountTable {
    /// Creates a handle on `table`.
    pub fn new(backend: Arc<dyn KvBackend>, table: impl Into<String>) -> Self {
        Self { backend, table: table.into() }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Writes the row if no row exists for the UUID or the stored row has the
    /// same login.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::IdentifierCollision` if the UUID holds a
    /// different login.
    /// Returns `DirectoryError::Codec` if the payload cannot be encoded.
    /// Returns `DirectoryError::Backend` for any other backend failure.
    pub fn create(&self, account: &Account) -> Result<()> {
        let request = PutItem::new(&self.table, account_item(account)?).condition(
            Condition::not_exists(ATTR_UUID)
                .or(Condition::equals(ATTR_LOGIN, account.login.as_str())),
        );
        match self.backend.put_item(request) {
            Ok(()) => Ok(()),
            Err(KvError::ConditionalCheckFailed { .. }) => {
                Err(DirectoryError::IdentifierCollision { uuid: account.uuid })
            },
            Err(e) => Err(e).context(BackendSnafu),
        }
    }

    /// Rewrites the payload and migration version of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AccountNotFound` if no row exists.
    /// Returns `DirectoryError::Codec` if the payload cannot be encoded.
    /// Returns `DirectoryError::Backend` for any other backend failure.
    pub fn update(&self, account: &Account) -> Result<()> {
        let payload = encode_payload(&account.data).context(CodecSnafu)?;
        let set = Item::from([
            (ATTR_DATA.to_string(), AttributeValue::B(payload)),
            (ATTR_VERSION.to_string(), AttributeValue::N(i64::from(account.migration_version))),
        ]);
        let request = UpdateItem::new(&self.table, uuid_key(account.uuid), set)
            .condition(Condition::exists(ATTR_LOGIN));
        match self.backend.update_item(request) {
            Ok(()) => Ok(()),
            Err(KvError::ConditionalCheckFailed { .. }) => {
                Err(DirectoryError::AccountNotFound { uuid: account.uuid })
            },
            Err(e) => Err(e).context(BackendSnafu),
        }
    }

    /// Consistent read of a row.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` or `DirectoryError::Codec` if
    /// the stored row cannot be restored.
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn get(&self, uuid: Uuid) -> Result<Option<Account>> {
        let item = self
            .backend
            .get_item(GetItem::new(&self.table, uuid_key(uuid)).consistent())
            .context(BackendSnafu)?;
        item.as_ref().map(account_from_item).transpose()
    }

    /// Deletes a row unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the delete fails.
    pub fn delete(&self, uuid: Uuid) -> Result<()> {
        self.backend.delete_item(DeleteItem::new(&self.table, uuid_key(uuid))).context(BackendSnafu)
    }

    /// Deletes a row only while it still holds `login`. Returns whether a
    /// matching row was removed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the delete fails.
    pub fn delete_if_login(&self, uuid: Uuid, login: &str) -> Result<bool> {
        let request = DeleteItem::new(&self.table, uuid_key(uuid))
            .condition(Condition::equals(ATTR_LOGIN, login));
        match self.backend.delete_item(request) {
            Ok(()) => Ok(true),
            Err(KvError::ConditionalCheckFailed { .. }) => Ok(false),
            Err(e) => Err(e).context(BackendSnafu),
        }
    }

    /// Writes the full row if none exists or the stored migration version is
    /// strictly lower. Returns `false` when the stored row is already at or
    /// past `account.migration_version`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Codec` if the payload cannot be encoded.
    /// Returns `DirectoryError::Backend` for any other backend failure.
    pub fn migrate(&self, account: &Account) -> Result<bool> {
        let request = PutItem::new(&self.table, account_item(account)?).condition(
            Condition::not_exists(ATTR_UUID)
                .or(Condition::less_than(ATTR_VERSION, i64::from(account.migration_version))),
        );
        match self.backend.put_item(request) {
            Ok(()) => Ok(true),
            Err(KvError::ConditionalCheckFailed { .. }) => Ok(false),
            Err(e) => Err(e).context(BackendSnafu),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use account_directory_store::InMemoryBackend;

    use super::*;

    fn table() -> AccountTable {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create_table("accounts", ATTR_UUID);
        AccountTable::new(backend, "accounts")
    }

    #[test]
    fn test_create_is_idempotent_for_same_login() {
        let table = table();
        let account = Account::new(Uuid::new_v4(), "alice");
        table.create(&account).unwrap();
        table.create(&account).unwrap();
        assert_eq!(table.get(account.uuid).unwrap(), Some(account));
    }

    #[test]
    fn test_create_rejects_uuid_with_other_login() {
        let table = table();
        let uuid = Uuid::new_v4();
        table.create(&Account::new(uuid, "alice")).unwrap();

        let err = table.create(&Account::new(uuid, "bob")).unwrap_err();
        assert!(matches!(err, DirectoryError::IdentifierCollision { uuid: u } if u == uuid));
    }

    #[test]
    fn test_update_requires_existing_row() {
        let table = table();
        let mut account = Account::new(Uuid::new_v4(), "alice");
        assert!(matches!(table.update(&account), Err(DirectoryError::AccountNotFound { .. })));

        table.create(&account).unwrap();
        account.data.profile_name = Some("Alice".into());
        account.migration_version = 4;
        table.update(&account).unwrap();
        assert_eq!(table.get(account.uuid).unwrap(), Some(account));
    }

    #[test]
    fn test_migrate_is_guarded_by_version() {
        let table = table();
        let uuid = Uuid::new_v4();

        assert!(table.migrate(&Account::new(uuid, "alice").with_migration_version(2)).unwrap());
        assert!(!table.migrate(&Account::new(uuid, "alice").with_migration_version(2)).unwrap());
        assert!(!table.migrate(&Account::new(uuid, "alice").with_migration_version(1)).unwrap());
        assert!(table.migrate(&Account::new(uuid, "alice").with_migration_version(3)).unwrap());

        assert_eq!(table.get(uuid).unwrap().unwrap().migration_version, 3);
    }

    #[test]
    fn test_delete_if_login_leaves_other_login() {
        let table = table();
        let account = Account::new(Uuid::new_v4(), "alice");
        table.create(&account).unwrap();

        assert!(!table.delete_if_login(account.uuid, "bob").unwrap());
        assert!(table.get(account.uuid).unwrap().is_some());
        assert!(table.delete_if_login(account.uuid, "alice").unwrap());
        assert!(table.get(account.uuid).unwrap().is_none());
    }
}
