//! Migration side-queues.
//!
//! Both queues are tables keyed by account UUID:
//! - [`TombstoneQueue`]: accounts deleted since the last reconciliation sweep
//! - [`RetryQueue`]: accounts whose migration write failed unexpectedly, with
//!   the login the migration tried to bind when it is known
//!
//! Entries are appended one at a time and drained in bulk through the
//! [`BatchWriteExecutor`].

use std::sync::Arc;

use account_directory_store::{
    AttributeValue, DeleteItem, GetItem, Item, KvBackend, PutItem, RequestItems, Scan,
    WriteRequest,
};
use snafu::ResultExt;
use tracing::debug;
use uuid::Uuid;

use crate::{
    batch::{BatchWriteExecutor, BatchWriteOutcome},
    error::{BackendSnafu, Result},
    schema::{ATTR_LOGIN, read_uuid, uuid_key},
};

/// Upper bound on a single scan page.
const SCAN_PAGE_SIZE: usize = 100;

/// Shared plumbing for a UUID-keyed queue table.
#[derive(Clone)]
struct UuidQueue {
    backend: Arc<dyn KvBackend>,
    executor: BatchWriteExecutor,
    table: String,
}

impl UuidQueue {
    fn put(&self, uuid: Uuid) -> Result<()> {
        self.put_item(uuid_key(uuid))
    }

    fn put_item(&self, item: Item) -> Result<()> {
        self.backend.put_item(PutItem::new(&self.table, item)).context(BackendSnafu)
    }

    fn get(&self, uuid: Uuid) -> Result<Option<Item>> {
        self.backend
            .get_item(GetItem::new(&self.table, uuid_key(uuid)).consistent())
            .context(BackendSnafu)
    }

    /// Pages through the table until `max` UUIDs are collected or the table ends.
    fn scan(&self, max: usize) -> Result<Vec<Uuid>> {
        let mut uuids = Vec::new();
        let mut start: Option<Item> = None;
        while uuids.len() < max {
            let limit = (max - uuids.len()).min(SCAN_PAGE_SIZE);
            let page = self
                .backend
                .scan(Scan { table: self.table.clone(), limit, exclusive_start_key: start })
                .context(BackendSnafu)?;
            for item in &page.items {
                uuids.push(read_uuid(item)?);
            }
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        uuids.truncate(max);
        Ok(uuids)
    }

    fn remove(&self, uuid: Uuid) -> Result<()> {
        self.backend.delete_item(DeleteItem::new(&self.table, uuid_key(uuid))).context(BackendSnafu)
    }

    fn remove_all(&self, uuids: &[Uuid]) -> Result<BatchWriteOutcome> {
        let mut outcome = BatchWriteOutcome::default();
        self.executor.write_in_batches(uuids.iter().copied(), |chunk| -> Result<()> {
            let deletes = chunk.into_iter().map(|uuid| WriteRequest::Delete { key: uuid_key(uuid) });
            let request = RequestItems::from([(self.table.clone(), deletes.collect())]);
            outcome.merge(self.executor.execute_until_complete(request).context(BackendSnafu)?);
            Ok(())
        })?;
        debug!(
            table = %self.table,
            removed = uuids.len(),
            unprocessed = outcome.unprocessed,
            "Drained queue entries"
        );
        Ok(outcome)
    }
}

/// Deleted-account tombstones awaiting reconciliation.
#[derive(Clone)]
pub struct TombstoneQueue {
    inner: UuidQueue,
}

impl TombstoneQueue {
    /// Creates a handle on `table`.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        executor: BatchWriteExecutor,
        table: impl Into<String>,
    ) -> Self {
        Self { inner: UuidQueue { backend, executor, table: table.into() } }
    }

    /// Records that `uuid` was deleted.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the write fails.
    pub fn put(&self, uuid: Uuid) -> Result<()> {
        self.inner.put(uuid)
    }

    /// Returns up to `limit` tombstoned UUIDs.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` if a row holds an invalid UUID.
    /// Returns `DirectoryError::Backend` if the scan fails.
    pub fn recently_deleted(&self, limit: usize) -> Result<Vec<Uuid>> {
        self.inner.scan(limit)
    }

    /// Removes the given tombstones in bulk.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if a bulk request fails outright.
    pub fn remove_all(&self, uuids: &[Uuid]) -> Result<BatchWriteOutcome> {
        self.inner.remove_all(uuids)
    }
}

/// Accounts whose migration must be re-driven.
#[derive(Clone)]
pub struct RetryQueue {
    inner: UuidQueue,
}

impl RetryQueue {
    /// Creates a handle on `table`.
    pub fn new(
        backend: Arc<dyn KvBackend>,
        executor: BatchWriteExecutor,
        table: impl Into<String>,
    ) -> Self {
        Self { inner: UuidQueue { backend, executor, table: table.into() } }
    }

    /// Records that migrating `uuid` failed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the write fails.
    pub fn put(&self, uuid: Uuid) -> Result<()> {
        self.inner.put(uuid)
    }

    /// Records that migrating `uuid` with `login` failed. The login lets a
    /// later delete release a binding whose account row never landed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the write fails.
    pub fn put_with_login(&self, uuid: Uuid, login: &str) -> Result<()> {
        let mut item = uuid_key(uuid);
        item.insert(ATTR_LOGIN.to_string(), AttributeValue::S(login.to_string()));
        self.inner.put_item(item)
    }

    /// Returns the login recorded with the entry for `uuid`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn login(&self, uuid: Uuid) -> Result<Option<String>> {
        let Some(item) = self.inner.get(uuid)? else {
            return Ok(None);
        };
        Ok(item.get(ATTR_LOGIN).and_then(AttributeValue::as_s).map(str::to_string))
    }

    /// Returns up to `max` queued UUIDs.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptAccount` if a row holds an invalid UUID.
    /// Returns `DirectoryError::Backend` if the scan fails.
    pub fn uuids(&self, max: usize) -> Result<Vec<Uuid>> {
        self.inner.scan(max)
    }

    /// Removes one entry.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the delete fails.
    pub fn remove(&self, uuid: Uuid) -> Result<()> {
        self.inner.remove(uuid)
    }

    /// Removes the given entries in bulk.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if a bulk request fails outright.
    pub fn remove_all(&self, uuids: &[Uuid]) -> Result<BatchWriteOutcome> {
        self.inner.remove_all(uuids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::BTreeSet;

    use account_directory_store::InMemoryBackend;
    use account_directory_types::config::BatchWriteConfig;

    use super::*;
    use crate::schema::ATTR_UUID;

    fn queues() -> (Arc<InMemoryBackend>, TombstoneQueue, RetryQueue) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create_table("tombstones", ATTR_UUID);
        backend.create_table("retries", ATTR_UUID);
        let executor = BatchWriteExecutor::new(backend.clone(), BatchWriteConfig::default());
        let tombstones = TombstoneQueue::new(backend.clone(), executor.clone(), "tombstones");
        let retries = RetryQueue::new(backend.clone(), executor, "retries");
        (backend, tombstones, retries)
    }

    #[test]
    fn test_tombstones_drain_in_bulk() {
        let (backend, tombstones, _) = queues();
        let uuids: Vec<Uuid> = (0..60).map(|_| Uuid::new_v4()).collect();
        for uuid in &uuids {
            tombstones.put(*uuid).unwrap();
        }
        tombstones.put(uuids[0]).unwrap();

        let listed = tombstones.recently_deleted(1000).unwrap();
        assert_eq!(
            listed.iter().collect::<BTreeSet<_>>(),
            uuids.iter().collect::<BTreeSet<_>>()
        );

        let outcome = tombstones.remove_all(&listed).unwrap();
        assert_eq!(outcome, BatchWriteOutcome { attempts: 3, unprocessed: 0 });
        assert_eq!(backend.item_count("tombstones"), 0);
    }

    #[test]
    fn test_scan_respects_limit_across_pages() {
        let (_, tombstones, _) = queues();
        for _ in 0..250 {
            tombstones.put(Uuid::new_v4()).unwrap();
        }
        assert_eq!(tombstones.recently_deleted(7).unwrap().len(), 7);
        assert_eq!(tombstones.recently_deleted(230).unwrap().len(), 230);
        assert_eq!(tombstones.recently_deleted(1000).unwrap().len(), 250);
        assert!(tombstones.recently_deleted(0).unwrap().is_empty());
    }

    #[test]
    fn test_retry_queue_put_list_remove() {
        let (backend, _, retries) = queues();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        retries.put(a).unwrap();
        retries.put(b).unwrap();

        retries.remove(a).unwrap();
        assert_eq!(retries.uuids(10).unwrap(), vec![b]);

        let outcome = retries.remove_all(&[b]).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(backend.item_count("retries"), 0);
    }

    #[test]
    fn test_retry_entry_keeps_login() {
        let (_, _, retries) = queues();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        retries.put_with_login(a, "+14155550100").unwrap();
        retries.put(b).unwrap();

        assert_eq!(retries.login(a).unwrap().as_deref(), Some("+14155550100"));
        assert_eq!(retries.login(b).unwrap(), None);
        assert_eq!(retries.login(Uuid::new_v4()).unwrap(), None);
        assert_eq!(retries.uuids(10).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_all_of_nothing_sends_nothing() {
        let (_, _, retries) = queues();
        assert_eq!(retries.remove_all(&[]).unwrap(), BatchWriteOutcome::default());
    }
}
