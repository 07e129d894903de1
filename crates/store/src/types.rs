//! Item, condition, and request types for the key-value backend.
//!
//! The model follows a DynamoDB-style API: items are attribute maps, each
//! table has a single partition-key attribute, and single-item writes may
//! carry a [`Condition`] evaluated atomically against the stored item.

use std::collections::BTreeMap;

/// A single attribute value.
///
/// Ordering is only meaningful between values of the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeValue {
    /// UTF-8 string.
    S(String),
    /// Signed integer.
    N(i64),
    /// Raw bytes.
    B(Vec<u8>),
}

impl AttributeValue {
    /// Returns the string value, if this is `S`.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is `N`.
    pub fn as_n(&self) -> Option<i64> {
        match self {
            Self::N(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the byte value, if this is `B`.
    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    fn less_than(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a < b,
            (Self::N(a), Self::N(b)) => a < b,
            (Self::B(a), Self::B(b)) => a < b,
            _ => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::B(value)
    }
}

/// An item (or key): attribute name → value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Builds a single-attribute key item.
pub fn key(name: &str, value: impl Into<AttributeValue>) -> Item {
    Item::from([(name.to_string(), value.into())])
}

/// Condition expression evaluated against the currently stored item.
///
/// An absent item has no attributes: `AttributeNotExists` holds and every
/// comparison fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The attribute is present.
    AttributeExists(String),
    /// The attribute is absent.
    AttributeNotExists(String),
    /// The attribute equals the value.
    Equals(String, AttributeValue),
    /// The attribute is strictly less than the value (same type only).
    LessThan(String, AttributeValue),
    /// Both conditions hold.
    And(Box<Condition>, Box<Condition>),
    /// Either condition holds.
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// `attribute_exists(name)`.
    pub fn exists(name: &str) -> Self {
        Self::AttributeExists(name.to_string())
    }

    /// `attribute_not_exists(name)`.
    pub fn not_exists(name: &str) -> Self {
        Self::AttributeNotExists(name.to_string())
    }

    /// `name = value`.
    pub fn equals(name: &str, value: impl Into<AttributeValue>) -> Self {
        Self::Equals(name.to_string(), value.into())
    }

    /// `name < value`.
    pub fn less_than(name: &str, value: impl Into<AttributeValue>) -> Self {
        Self::LessThan(name.to_string(), value.into())
    }

    /// `self AND other`.
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Evaluates the condition against the stored item.
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        let attr = |name: &str| item.and_then(|i| i.get(name));
        match self {
            Self::AttributeExists(name) => attr(name).is_some(),
            Self::AttributeNotExists(name) => attr(name).is_none(),
            Self::Equals(name, value) => attr(name) == Some(value),
            Self::LessThan(name, value) => attr(name).is_some_and(|v| v.less_than(value)),
            Self::And(a, b) => a.evaluate(item) && b.evaluate(item),
            Self::Or(a, b) => a.evaluate(item) || b.evaluate(item),
        }
    }
}

/// What a failed conditional write reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnValues {
    /// Report nothing.
    #[default]
    None,
    /// Attach the stored item to the conditional-check failure.
    AllOld,
}

/// Conditional single-item put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutItem {
    /// Target table.
    pub table: String,
    /// Full item, including the partition key.
    pub item: Item,
    /// Predicate on the stored item.
    pub condition: Option<Condition>,
    /// Failure reporting.
    pub return_values_on_condition_check_failure: ReturnValues,
}

impl PutItem {
    /// Creates an unconditional put.
    pub fn new(table: impl Into<String>, item: Item) -> Self {
        Self {
            table: table.into(),
            item,
            condition: None,
            return_values_on_condition_check_failure: ReturnValues::None,
        }
    }

    /// Attaches a condition.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns the stored item when the condition fails.
    #[must_use]
    pub fn return_old_on_failure(mut self) -> Self {
        self.return_values_on_condition_check_failure = ReturnValues::AllOld;
        self
    }
}

/// Conditional single-item attribute update.
///
/// When no item exists and the condition holds, the item is created from the
/// key plus the set attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateItem {
    /// Target table.
    pub table: String,
    /// Partition key.
    pub key: Item,
    /// Attributes to overwrite.
    pub set: Item,
    /// Predicate on the stored item.
    pub condition: Option<Condition>,
}

impl UpdateItem {
    /// Creates an unconditional update.
    pub fn new(table: impl Into<String>, key: Item, set: Item) -> Self {
        Self { table: table.into(), key, set, condition: None }
    }

    /// Attaches a condition.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Conditional single-item delete. Deleting an absent item succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteItem {
    /// Target table.
    pub table: String,
    /// Partition key.
    pub key: Item,
    /// Predicate on the stored item.
    pub condition: Option<Condition>,
}

impl DeleteItem {
    /// Creates an unconditional delete.
    pub fn new(table: impl Into<String>, key: Item) -> Self {
        Self { table: table.into(), key, condition: None }
    }

    /// Attaches a condition.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Single-item read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetItem {
    /// Target table.
    pub table: String,
    /// Partition key.
    pub key: Item,
    /// Read the latest committed value rather than a possibly stale replica.
    pub consistent_read: bool,
}

impl GetItem {
    /// Creates an eventually consistent read.
    pub fn new(table: impl Into<String>, key: Item) -> Self {
        Self { table: table.into(), key, consistent_read: false }
    }

    /// Requests a strongly consistent read.
    #[must_use]
    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }
}

/// One entry of a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    /// Unconditional put of a full item.
    Put {
        /// The item.
        item: Item,
    },
    /// Unconditional delete by key.
    Delete {
        /// The partition key.
        key: Item,
    },
}

/// Table name → writes, the shape of a bulk request and of its unprocessed remainder.
pub type RequestItems = BTreeMap<String, Vec<WriteRequest>>;

/// Counts the write requests across all tables.
pub fn request_count(items: &RequestItems) -> usize {
    items.values().map(Vec::len).sum()
}

/// Unconditional bulk write across tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteItem {
    /// Writes grouped by table.
    pub request_items: RequestItems,
}

/// Result of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteResponse {
    /// Writes the backend did not apply; the caller should resubmit them.
    pub unprocessed_items: RequestItems,
}

/// Paged full-table read in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Target table.
    pub table: String,
    /// Maximum items in the page.
    pub limit: usize,
    /// Resume after this key.
    pub exclusive_start_key: Option<Item>,
}

/// One page of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Items in key order.
    pub items: Vec<Item>,
    /// Key to resume from; `None` once the table is exhausted.
    pub last_evaluated_key: Option<Item>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_absent_item_only_satisfies_not_exists() {
        assert!(Condition::not_exists("P").evaluate(None));
        assert!(!Condition::exists("P").evaluate(None));
        assert!(!Condition::equals("P", "x").evaluate(None));
        assert!(!Condition::less_than("V", 5i64).evaluate(None));
    }

    #[test]
    fn test_create_or_same_login_condition() {
        let cond = Condition::not_exists("P").or(Condition::equals("P", "alice"));
        let same = item(&[("P", "alice".into())]);
        let other = item(&[("P", "bob".into())]);

        assert!(cond.evaluate(None));
        assert!(cond.evaluate(Some(&same)));
        assert!(!cond.evaluate(Some(&other)));
    }

    #[test]
    fn test_version_guard_is_strict() {
        let cond =
            Condition::not_exists("U").or(Condition::exists("U").and(Condition::less_than("V", 2i64)));
        let v1 = item(&[("U", vec![1u8].into()), ("V", 1i64.into())]);
        let v2 = item(&[("U", vec![1u8].into()), ("V", 2i64.into())]);

        assert!(cond.evaluate(Some(&v1)));
        assert!(!cond.evaluate(Some(&v2)), "equal version must not pass");
    }

    #[test]
    fn test_less_than_across_types_is_false() {
        let stored = item(&[("V", "1".into())]);
        assert!(!Condition::less_than("V", 5i64).evaluate(Some(&stored)));
    }

    #[test]
    fn test_request_count_sums_tables() {
        let mut items = RequestItems::new();
        items.insert("a".into(), vec![WriteRequest::Delete { key: key("U", 1i64) }; 3]);
        items.insert("b".into(), vec![WriteRequest::Put { item: key("U", 2i64) }]);
        assert_eq!(request_count(&items), 4);
    }
}
