//! Directory version counter.

use std::sync::Arc;

use account_directory_store::{AttributeValue, GetItem, Item, KvBackend, PutItem};
use snafu::ResultExt;

use crate::{
    error::{BackendSnafu, DirectoryError, Result},
    schema::{ATTR_MISC_NAME, ATTR_MISC_VALUE, DIRECTORY_VERSION_KEY},
};

/// Singleton row in the misc table advanced whenever directory membership changes.
#[derive(Clone)]
pub struct DirectoryVersionCounter {
    backend: Arc<dyn KvBackend>,
    table: String,
}

impl DirectoryVersionCounter {
    /// Creates a handle on the counter row in `table`.
    pub fn new(backend: Arc<dyn KvBackend>, table: impl Into<String>) -> Self {
        Self { backend, table: table.into() }
    }

    fn key() -> Item {
        Item::from([(
            ATTR_MISC_NAME.to_string(),
            AttributeValue::S(DIRECTORY_VERSION_KEY.to_string()),
        )])
    }

    /// Stores `version` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Backend` if the write fails.
    pub fn set(&self, version: i64) -> Result<()> {
        let mut item = Self::key();
        item.insert(ATTR_MISC_VALUE.to_string(), AttributeValue::S(version.to_string()));
        self.backend.put_item(PutItem::new(&self.table, item)).context(BackendSnafu)
    }

    /// Reads the stored version, `None` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::CorruptCounter` if the stored value is not a decimal integer.
    /// Returns `DirectoryError::Backend` if the read fails.
    pub fn get(&self) -> Result<Option<i64>> {
        let item = self
            .backend
            .get_item(GetItem::new(&self.table, Self::key()).consistent())
            .context(BackendSnafu)?;
        let Some(item) = item else {
            return Ok(None);
        };

        match item.get(ATTR_MISC_VALUE) {
            Some(AttributeValue::S(value)) => value
                .parse()
                .map(Some)
                .map_err(|_| DirectoryError::CorruptCounter { value: value.clone() }),
            Some(AttributeValue::N(value)) => Ok(Some(*value)),
            Some(other) => Err(DirectoryError::CorruptCounter { value: format!("{other:?}") }),
            None => Err(DirectoryError::CorruptCounter { value: String::new() }),
        }
    }
}
