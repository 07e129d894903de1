//! In-memory key-value backend for testing.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use super::{KvBackend, MAX_BATCH_WRITE_ITEMS};
use crate::{
    error::{KvError, Result},
    types::{
        AttributeValue, BatchWriteItem, BatchWriteResponse, Condition, DeleteItem, GetItem, Item,
        PutItem, ReturnValues, Scan, ScanPage, UpdateItem, WriteRequest, request_count,
    },
};

/// One table: the partition-key attribute and its items ordered by key.
#[derive(Debug)]
struct Table {
    partition_key: String,
    items: BTreeMap<AttributeValue, Item>,
}

impl Table {
    fn key_of(&self, table: &str, key: &Item) -> Result<AttributeValue> {
        key.get(&self.partition_key).cloned().ok_or_else(|| KvError::Validation {
            message: format!("missing partition key {} for table {table}", self.partition_key),
        })
    }

    fn check(
        &self,
        table: &str,
        key: &AttributeValue,
        condition: Option<&Condition>,
        return_values: ReturnValues,
    ) -> Result<()> {
        let Some(condition) = condition else {
            return Ok(());
        };
        let stored = self.items.get(key);
        if condition.evaluate(stored) {
            return Ok(());
        }
        let existing = match return_values {
            ReturnValues::AllOld => stored.cloned(),
            ReturnValues::None => None,
        };
        Err(KvError::ConditionalCheckFailed { table: table.to_string(), existing })
    }
}

/// In-memory key-value backend for testing.
///
/// Every table lives behind one lock, so each single-item write evaluates its
/// condition and applies atomically. Data is lost when the backend is dropped.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryBackend {
    /// Creates a backend with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table keyed on `partition_key`. Re-creating a table keeps its items.
    pub fn create_table(&self, name: &str, partition_key: &str) {
        self.tables.write().entry(name.to_string()).or_insert_with(|| {
            debug!(table = name, partition_key, "Created table");
            Table { partition_key: partition_key.to_string(), items: BTreeMap::new() }
        });
    }

    /// Returns the number of items in a table, or zero if it does not exist.
    pub fn item_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.items.len())
    }

    /// Returns every item in a table in key order.
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.tables.read().get(table).map(|t| t.items.values().cloned().collect()).unwrap_or_default()
    }

    /// Removes every item from every table, keeping the tables.
    pub fn clear(&self) {
        for table in self.tables.write().values_mut() {
            table.items.clear();
        }
    }
}

fn table_not_found(table: &str) -> KvError {
    KvError::TableNotFound { table: table.to_string() }
}

impl KvBackend for InMemoryBackend {
    fn put_item(&self, request: PutItem) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(&request.table).ok_or_else(|| table_not_found(&request.table))?;
        let key = table.key_of(&request.table, &request.item)?;
        table.check(
            &request.table,
            &key,
            request.condition.as_ref(),
            request.return_values_on_condition_check_failure,
        )?;
        table.items.insert(key, request.item);
        Ok(())
    }

    fn update_item(&self, request: UpdateItem) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(&request.table).ok_or_else(|| table_not_found(&request.table))?;
        let key = table.key_of(&request.table, &request.key)?;
        table.check(&request.table, &key, request.condition.as_ref(), ReturnValues::None)?;

        let item = table.items.entry(key).or_insert_with(|| request.key.clone());
        item.extend(request.set);
        Ok(())
    }

    fn delete_item(&self, request: DeleteItem) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(&request.table).ok_or_else(|| table_not_found(&request.table))?;
        let key = table.key_of(&request.table, &request.key)?;
        table.check(&request.table, &key, request.condition.as_ref(), ReturnValues::None)?;
        table.items.remove(&key);
        Ok(())
    }

    fn get_item(&self, request: GetItem) -> Result<Option<Item>> {
        let tables = self.tables.read();
        let table = tables.get(&request.table).ok_or_else(|| table_not_found(&request.table))?;
        let key = table.key_of(&request.table, &request.key)?;
        Ok(table.items.get(&key).cloned())
    }

    fn batch_write_item(&self, request: BatchWriteItem) -> Result<BatchWriteResponse> {
        let count = request_count(&request.request_items);
        if count == 0 || count > MAX_BATCH_WRITE_ITEMS {
            return Err(KvError::Validation {
                message: format!(
                    "batch write must hold 1..={MAX_BATCH_WRITE_ITEMS} requests, got {count}"
                ),
            });
        }

        let mut tables = self.tables.write();

        // Validate every table and key before applying anything.
        for (name, writes) in &request.request_items {
            let table = tables.get(name).ok_or_else(|| table_not_found(name))?;
            for write in writes {
                let item = match write {
                    WriteRequest::Put { item } => item,
                    WriteRequest::Delete { key } => key,
                };
                table.key_of(name, item)?;
            }
        }

        for (name, writes) in request.request_items {
            let Some(table) = tables.get_mut(&name) else {
                return Err(table_not_found(&name));
            };
            for write in writes {
                match write {
                    WriteRequest::Put { item } => {
                        let key = table.key_of(&name, &item)?;
                        table.items.insert(key, item);
                    },
                    WriteRequest::Delete { key } => {
                        let key = table.key_of(&name, &key)?;
                        table.items.remove(&key);
                    },
                }
            }
        }

        Ok(BatchWriteResponse::default())
    }

    fn scan(&self, request: Scan) -> Result<ScanPage> {
        let tables = self.tables.read();
        let table = tables.get(&request.table).ok_or_else(|| table_not_found(&request.table))?;
        let limit = request.limit.max(1);

        let start = match &request.exclusive_start_key {
            Some(key) => std::ops::Bound::Excluded(table.key_of(&request.table, key)?),
            None => std::ops::Bound::Unbounded,
        };

        let mut range = table.items.range((start, std::ops::Bound::Unbounded));
        let items: Vec<Item> = range.by_ref().take(limit).map(|(_, item)| item.clone()).collect();
        let last_evaluated_key = if range.next().is_some() {
            items.last().and_then(|last| {
                last.get(&table.partition_key)
                    .map(|v| Item::from([(table.partition_key.clone(), v.clone())]))
            })
        } else {
            None
        };

        Ok(ScanPage { items, last_evaluated_key })
    }
}
