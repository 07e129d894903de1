//! Errors returned by the account directory.

use account_directory_store::KvError;
use account_directory_types::{CodecError, ErrorCode};
use snafu::Snafu;
use uuid::Uuid;

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors returned by [`AccountDirectoryStore`](crate::AccountDirectoryStore)
/// and the tables beneath it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DirectoryError {
    /// The UUID is already bound to a different login.
    #[snafu(display("UUID {uuid} is already bound to a different login"))]
    IdentifierCollision {
        /// The colliding UUID.
        uuid: Uuid,
    },

    /// The account row does not exist.
    #[snafu(display("Account {uuid} not found"))]
    AccountNotFound {
        /// The missing account.
        uuid: Uuid,
    },

    /// The login is bound to an owner whose account row is gone.
    #[snafu(display("Login {login} is bound to an account that no longer exists"))]
    LoginOwnerMissing {
        /// The orphaned login.
        login: String,
    },

    /// A stored row is missing attributes or holds invalid values.
    #[snafu(display("Corrupt account row: {reason}"))]
    CorruptAccount {
        /// What was wrong with the row.
        reason: String,
    },

    /// The directory version row holds a non-numeric value.
    #[snafu(display("Corrupt directory version: {value:?}"))]
    CorruptCounter {
        /// The stored value.
        value: String,
    },

    /// Payload serialization or deserialization failed.
    #[snafu(display("Codec error: {source}"))]
    Codec {
        source: CodecError,
        #[snafu(implicit)]
        location: snafu::Location,
    },

    /// The key-value backend failed.
    #[snafu(display("Backend error at {location}: {source}"))]
    Backend {
        source: KvError,
        #[snafu(implicit)]
        location: snafu::Location,
    },
}

impl DirectoryError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IdentifierCollision { .. } => ErrorCode::DirectoryIdentifierCollision,
            Self::AccountNotFound { .. } => ErrorCode::DirectoryAccountNotFound,
            Self::LoginOwnerMissing { .. } => ErrorCode::DirectoryLoginOwnerMissing,
            Self::CorruptAccount { .. } | Self::CorruptCounter { .. } => {
                ErrorCode::DirectoryCorruptData
            },
            Self::Codec { .. } => ErrorCode::DirectorySerialization,
            Self::Backend { source, .. } => source.code(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}
