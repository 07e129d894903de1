//! Migration metrics emitted through the `metrics` facade.
//!
//! Names follow `account_directory_{subsystem}_{name}_{unit}`.

use metrics::counter;

const MIGRATED_TOTAL: &str = "account_directory_migration_migrated_total";
const ALREADY_MIGRATED_TOTAL: &str = "account_directory_migration_already_migrated_total";
const ERRORS_TOTAL: &str = "account_directory_migration_errors_total";
const RETRY_ENQUEUED_TOTAL: &str = "account_directory_migration_retry_enqueued_total";
const RECONCILE_TOMBSTONES_TOTAL: &str = "account_directory_reconcile_tombstones_total";

/// Records the outcome of one `migrate_one` call.
#[inline]
pub fn record_account_outcome(outcome: Option<bool>) {
    match outcome {
        Some(true) => counter!(MIGRATED_TOTAL).increment(1),
        Some(false) => counter!(ALREADY_MIGRATED_TOTAL).increment(1),
        None => counter!(ERRORS_TOTAL).increment(1),
    }
}

/// Records a UUID written to the retry queue.
#[inline]
pub fn record_retry_enqueued() {
    counter!(RETRY_ENQUEUED_TOTAL).increment(1);
}

/// Records tombstones processed by a reconciliation sweep.
#[inline]
pub fn record_tombstones_reconciled(count: usize) {
    counter!(RECONCILE_TOMBSTONES_TOTAL).increment(count as u64);
}
