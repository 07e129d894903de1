//! Error code catalog for the account directory.
//!
//! Each crate defines its own snafu error enum; every variant maps to an
//! [`ErrorCode`] with a unique numeric identifier, retryability
//! classification, and suggested recovery action, so collaborators can
//! classify failures without matching on crate-specific types.

use core::fmt;

/// Machine-readable error codes for programmatic error handling.
///
/// Codes are organized into ranges:
///
/// | Range       | Domain    | Examples                                       |
/// |-------------|-----------|------------------------------------------------|
/// | 1000–1099   | Backend   | Conditional check, throttling, unknown table   |
/// | 3000–3099   | Directory | Identifier collision, missing account          |
/// | 3100–3199   | Directory | Corrupt stored data, payload codec             |
/// | 4000–4099   | Migration | Write failure, worker join, legacy source      |
/// | 5000–5099   | Config    | Validation                                     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Backend errors (1000–1099) ---
    /// A conditional write's predicate did not hold.
    BackendConditionFailed = 1000,
    /// The request referenced a table the backend does not know.
    BackendTableNotFound = 1001,
    /// The request was malformed (for example an oversized batch).
    BackendValidation = 1002,
    /// The backend throttled the request.
    BackendThrottled = 1003,
    /// The backend was unreachable or failed internally.
    BackendUnavailable = 1004,

    // --- Directory errors (3000–3199) ---
    /// A different login is already attached to the UUID.
    DirectoryIdentifierCollision = 3000,
    /// The account row does not exist.
    DirectoryAccountNotFound = 3001,
    /// The login index points at an owner whose account row is gone.
    DirectoryLoginOwnerMissing = 3002,
    /// A stored row is missing attributes or holds invalid values.
    DirectoryCorruptData = 3100,
    /// The account payload could not be encoded or decoded.
    DirectorySerialization = 3101,

    // --- Migration errors (4000–4099) ---
    /// A migration write failed unexpectedly and was queued for retry.
    MigrationWriteFailed = 4000,
    /// A migration worker task panicked or was cancelled.
    MigrationWorkerFailed = 4001,
    /// The legacy account source failed.
    MigrationLegacySource = 4002,

    // --- Config errors (5000–5099) ---
    /// A configuration value is out of range.
    ConfigValidation = 5000,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::BackendConditionFailed),
            1001 => Some(Self::BackendTableNotFound),
            1002 => Some(Self::BackendValidation),
            1003 => Some(Self::BackendThrottled),
            1004 => Some(Self::BackendUnavailable),
            3000 => Some(Self::DirectoryIdentifierCollision),
            3001 => Some(Self::DirectoryAccountNotFound),
            3002 => Some(Self::DirectoryLoginOwnerMissing),
            3100 => Some(Self::DirectoryCorruptData),
            3101 => Some(Self::DirectorySerialization),
            4000 => Some(Self::MigrationWriteFailed),
            4001 => Some(Self::MigrationWorkerFailed),
            4002 => Some(Self::MigrationLegacySource),
            5000 => Some(Self::ConfigValidation),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Retryable errors may succeed on a subsequent attempt, typically after
    /// backoff. Non-retryable errors require corrective action before retrying.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::BackendThrottled
                | Self::BackendUnavailable
                | Self::MigrationWriteFailed
                | Self::MigrationWorkerFailed
                | Self::MigrationLegacySource
        )
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::BackendConditionFailed => {
                "Re-read the current item and decide whether the write is still needed."
            },
            Self::BackendTableNotFound => "Create the table or fix the configured table name.",
            Self::BackendValidation => "Fix the request shape. Batches hold at most 25 writes.",
            Self::BackendThrottled => "Retry with exponential backoff.",
            Self::BackendUnavailable => "Retry with backoff and check backend health.",
            Self::DirectoryIdentifierCollision => {
                "The UUID already belongs to another login. Allocate a fresh UUID."
            },
            Self::DirectoryAccountNotFound => "Create the account before updating it.",
            Self::DirectoryLoginOwnerMissing => {
                "Run tombstone reconciliation, then retry the create."
            },
            Self::DirectoryCorruptData => {
                "Stored data is corrupt. Inspect the row and restore it from the legacy store."
            },
            Self::DirectorySerialization => {
                "Payload codec failure. Check the payload schema version of the stored row."
            },
            Self::MigrationWriteFailed => {
                "The account was queued for retry. Re-drive the retry queue later."
            },
            Self::MigrationWorkerFailed => "Rerun the batch. Migration is idempotent.",
            Self::MigrationLegacySource => "Check the legacy store and re-drive the retry queue.",
            Self::ConfigValidation => "Fix the configuration value and restart.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
