//! Login → UUID uniqueness table.
//!
//! A login maps to at most one UUID. A claim succeeds when the login is free
//! or already bound to the claimant; otherwise it reports the current owner
//! so the caller can resolve the conflict.

use std::sync::Arc;

use account_directory_store::{
    AttributeValue, Condition, DeleteItem, GetItem, Item, KvBackend, KvError, PutItem,
};
use snafu::ResultExt;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{BackendSnafu, DirectoryError, Result},
    schema::{ATTR_LOGIN, ATTR_UUID, login_key, read_uuid, uuid_value},
};

/// Result of claiming a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginClaim {
    /// The login is bound to the claimant.
    Claimed,
    /// The login is bound to another account.
    Owned {
        /// The existing owner.
        owner: Uuid,
    },
}

/// The login uniqueness table.
#[derive(Clone)]
pub struct LoginUniquenessIndex {
    backend: Arc<dyn KvBackend>,
    table: String,
}

impl LoginUniquenessIndex {
    /// Creates a handle on `table`.
    pub fn new(backend: Arc<dyn KvBackend>, table: impl Into<String>) -> Self {
        Self { backend, table: table.into() }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn claim_request(&self, login: &str, uuid: Uuid) -> PutItem {
        let item = Item::from([
            (ATTR_LOGIN.to_string(), AttributeValue::S(login.to_string())),
            (ATTR_UUID.to_string(), uuid_value(uuid)),
        ]);
        PutItem::new(&self.table, item).condition(
            Condition::not_exists(ATTR_LOGIN).or(Condition::equals(ATTR_UUID, uuid_value(uuid))),
        )
    }

    /// Binds `login` to `uuid` unless another UUID holds it.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::LoginOwnerMissing` if the claim was refused but
    /// the owning row vanished before it could be read.
    /// Returns `DirectoryError::CorruptAccount` if the owning row has no valid UUID.
    /// Returns `DirectoryError::Backend` for any other backend failure.
    pub fn claim(&self, login: &str, uuid: Uuid) -> Result<LoginClaim> {
        let request = self.claim_request(login, uuid).return_old_on_failure();
        let existing = match self.backend.put_item(request) {
            Ok(()) => return Ok(LoginClaim::Claimed),
            Err(KvError::ConditionalCheckFailed { existing, .. }) => existing,
            Err(e) => return Err(e).context(BackendSnafu),
        };

        let owner = match existing {
            Some(item) => read_uuid(&item)?,
            None => self
                .get(login)?
                .ok_or_else(|| DirectoryError::LoginOwnerMissing { login: login.to_string() })?,
        };
        Ok(LoginClaim::Owned { owner })
    }

    /// Migration-path claim: binds `login` to `uuid` if free or already bound
    /// to it. Returns `false` when another UUID holds the login.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` for any failure other than the
    /// condition check.
    pub fn migrate(&self, login: &str, uuid: Uuid) -> Result<bool> {
        let request = self.claim_request(login, uuid).return_old_on_failure();
        match self.backend.put_item(request) {
            Ok(()) => Ok(true),
            Err(KvError::ConditionalCheckFailed { existing, .. }) => {
                let owner = existing.as_ref().and_then(|item| read_uuid(item).ok());
                debug!(uuid = %uuid, login, owner = ?owner, "Login held by another account");
                Ok(false)
            },
            Err(e) => Err(e).context(BackendSnafu),
        }
    }

    /// Returns the UUID bound to `login`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` if the row has no valid UUID.
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn get(&self, login: &str) -> Result<Option<Uuid>> {
        let item = self
            .backend
            .get_item(GetItem::new(&self.table, login_key(login)).consistent())
            .context(BackendSnafu)?;
        item.as_ref().map(read_uuid).transpose()
    }

    /// Releases `login` if it is still bound to `uuid`. Returns whether the
    /// binding was removed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the delete fails.
    pub fn release(&self, login: &str, uuid: Uuid) -> Result<bool> {
        let request = DeleteItem::new(&self.table, login_key(login))
            .condition(Condition::equals(ATTR_UUID, uuid_value(uuid)));
        match self.backend.delete_item(request) {
            Ok(()) => Ok(true),
            Err(KvError::ConditionalCheckFailed { .. }) => Ok(false),
            Err(e) => Err(e).context(BackendSnafu),
        }
    }
}
