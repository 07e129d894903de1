//! Errors returned by the migration subsystem.

use account_directory_state::DirectoryError;
use account_directory_types::ErrorCode;
use snafu::Snafu;
use uuid::Uuid;

use crate::legacy::LegacyError;

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Errors returned by [`MigrationCoordinator`](crate::MigrationCoordinator).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MigrationError {
    /// A migration write failed for a reason other than its condition.
    ///
    /// The UUID has been queued for retry unless recording the retry failed too.
    #[snafu(display("Migration write for {uuid} failed: {source}"))]
    Write {
        /// Account being migrated.
        uuid: Uuid,
        source: DirectoryError,
    },

    /// A blocking worker panicked or was cancelled.
    #[snafu(display("Migration worker failed: {message}"))]
    Join {
        /// Join failure description.
        message: String,
    },

    /// The tombstone reconciliation sweep failed.
    #[snafu(display("Tombstone reconciliation failed: {source}"))]
    Reconcile { source: DirectoryError },

    /// Reading or draining the retry queue failed.
    #[snafu(display("Retry queue access failed: {source}"))]
    Queue { source: DirectoryError },

    /// The legacy store could not load an account.
    #[snafu(display("Legacy load of {uuid} failed: {source}"))]
    Legacy {
        /// Account being loaded.
        uuid: Uuid,
        source: LegacyError,
    },
}

impl MigrationError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Write { .. } => ErrorCode::MigrationWriteFailed,
            Self::Join { .. } => ErrorCode::MigrationWorkerFailed,
            Self::Reconcile { source } | Self::Queue { source } => source.code(),
            Self::Legacy { .. } => ErrorCode::MigrationLegacySource,
        }
    }
}

impl From<tokio::task::JoinError> for MigrationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join { message: err.to_string() }
    }
}
