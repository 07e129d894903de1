//! Key-value backend abstraction.
//!
//! The backend trait abstracts the remote table service, allowing the
//! directory to run against a production client or the in-memory
//! implementation used in tests.
//!
//! # Contract
//!
//! - Single-item writes evaluate their [`Condition`](crate::Condition)
//!   atomically against the stored item.
//! - A failed condition returns [`KvError::ConditionalCheckFailed`], carrying
//!   the stored item when the request asked for [`ReturnValues::AllOld`].
//! - Bulk writes are unconditional, hold at most [`MAX_BATCH_WRITE_ITEMS`]
//!   requests, and may return part of the request as unprocessed.
//!
//! [`KvError::ConditionalCheckFailed`]: crate::KvError::ConditionalCheckFailed
//! [`ReturnValues::AllOld`]: crate::ReturnValues::AllOld

mod memory;

pub use memory::InMemoryBackend;

use crate::{
    error::Result,
    types::{
        BatchWriteItem, BatchWriteResponse, DeleteItem, GetItem, Item, PutItem, Scan, ScanPage,
        UpdateItem,
    },
};

/// Largest bulk write the backend accepts.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Backend trait for the remote key-value table service.
pub trait KvBackend: Send + Sync {
    /// Writes a full item, replacing any stored item with the same key.
    ///
    /// # Errors
    ///
    /// Returns `KvError::ConditionalCheckFailed` if the condition does not hold.
    /// Returns `KvError::TableNotFound` if the table is unknown.
    /// Returns `KvError::Validation` if the item lacks the partition key.
    fn put_item(&self, request: PutItem) -> Result<()>;

    /// Overwrites the given attributes, creating the item if absent.
    ///
    /// # Errors
    ///
    /// Returns `KvError::ConditionalCheckFailed` if the condition does not hold.
    /// Returns `KvError::TableNotFound` if the table is unknown.
    fn update_item(&self, request: UpdateItem) -> Result<()>;

    /// Deletes an item. Deleting an absent item without a condition succeeds.
    ///
    /// # Errors
    ///
    /// Returns `KvError::ConditionalCheckFailed` if the condition does not hold.
    /// Returns `KvError::TableNotFound` if the table is unknown.
    fn delete_item(&self, request: DeleteItem) -> Result<()>;

    /// Reads an item by key.
    ///
    /// # Errors
    ///
    /// Returns `KvError::TableNotFound` if the table is unknown.
    fn get_item(&self, request: GetItem) -> Result<Option<Item>>;

    /// Applies unconditional puts and deletes across tables.
    ///
    /// # Errors
    ///
    /// Returns `KvError::Validation` if the request is empty or exceeds
    /// [`MAX_BATCH_WRITE_ITEMS`].
    /// Returns `KvError::TableNotFound` if any table is unknown.
    fn batch_write_item(&self, request: BatchWriteItem) -> Result<BatchWriteResponse>;

    /// Reads one page of a table in key order.
    ///
    /// # Errors
    ///
    /// Returns `KvError::TableNotFound` if the table is unknown.
    fn scan(&self, request: Scan) -> Result<ScanPage>;
}

impl<T: KvBackend + ?Sized> KvBackend for std::sync::Arc<T> {
    fn put_item(&self, request: PutItem) -> Result<()> {
        (**self).put_item(request)
    }

    fn update_item(&self, request: UpdateItem) -> Result<()> {
        (**self).update_item(request)
    }

    fn delete_item(&self, request: DeleteItem) -> Result<()> {
        (**self).delete_item(request)
    }

    fn get_item(&self, request: GetItem) -> Result<Option<Item>> {
        (**self).get_item(request)
    }

    fn batch_write_item(&self, request: BatchWriteItem) -> Result<BatchWriteResponse> {
        (**self).batch_write_item(request)
    }

    fn scan(&self, request: Scan) -> Result<ScanPage> {
        (**self).scan(request)
    }
}
