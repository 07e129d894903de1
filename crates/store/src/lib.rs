//! account-directory-store: the key-value backend contract for the account directory.
//!
//! The directory persists accounts in a remote table service with a
//! DynamoDB-style API. This crate defines that contract and an in-memory
//! implementation:
//!
//! - **Items** are attribute maps keyed by a single partition-key attribute
//! - **Conditional writes** evaluate a [`Condition`] atomically per item
//! - **Bulk writes** are unconditional, capped at [`MAX_BATCH_WRITE_ITEMS`],
//!   and may leave part of the request unprocessed
//! - **Scans** page through a table in key order
//!
//! ## Quick Start
//!
//! ```
//! use account_directory_store::{Condition, GetItem, InMemoryBackend, KvBackend, PutItem, key};
//!
//! let backend = InMemoryBackend::new();
//! backend.create_table("logins", "P");
//!
//! let claim = PutItem::new("logins", key("P", "+14155550100"))
//!     .condition(Condition::not_exists("P"));
//! backend.put_item(claim.clone())?;
//! assert!(backend.put_item(claim).unwrap_err().is_conditional_check_failed());
//!
//! let row = backend.get_item(GetItem::new("logins", key("P", "+14155550100")))?;
//! assert!(row.is_some());
//! # Ok::<(), account_directory_store::KvError>(())
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{InMemoryBackend, KvBackend, MAX_BATCH_WRITE_ITEMS};
pub use error::{KvError, Result};
pub use types::{
    AttributeValue, BatchWriteItem, BatchWriteResponse, Condition, DeleteItem, GetItem, Item,
    PutItem, RequestItems, ReturnValues, Scan, ScanPage, UpdateItem, WriteRequest, key,
    request_count,
};
