//! Error types for the key-value backend.

use account_directory_types::ErrorCode;
use snafu::Snafu;

use crate::types::Item;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, KvError>;

/// Errors returned by a [`KvBackend`](crate::KvBackend).
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum KvError {
    /// The write's condition did not hold against the stored item.
    #[snafu(display("Conditional check failed on table {table}"))]
    ConditionalCheckFailed {
        /// Table the write targeted.
        table: String,
        /// Stored item, when the request asked for it.
        existing: Option<Item>,
    },

    /// The table does not exist.
    #[snafu(display("Table not found: {table}"))]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// The request was malformed.
    #[snafu(display("Validation error: {message}"))]
    Validation {
        /// What was wrong with the request.
        message: String,
    },

    /// The backend throttled the request.
    #[snafu(display("Request throttled on table {table}"))]
    Throttled {
        /// Throttled table.
        table: String,
    },

    /// The backend was unreachable or failed internally.
    #[snafu(display("Backend unavailable: {message}"))]
    Unavailable {
        /// Failure description.
        message: String,
    },
}

impl KvError {
    /// Whether this is a conditional-check failure rather than a fault.
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Self::ConditionalCheckFailed { .. })
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConditionalCheckFailed { .. } => ErrorCode::BackendConditionFailed,
            Self::TableNotFound { .. } => ErrorCode::BackendTableNotFound,
            Self::Validation { .. } => ErrorCode::BackendValidation,
            Self::Throttled { .. } => ErrorCode::BackendThrottled,
            Self::Unavailable { .. } => ErrorCode::BackendUnavailable,
        }
    }
}
