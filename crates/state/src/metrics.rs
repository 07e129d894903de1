//! Metrics emitted through the `metrics` facade.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `account_directory_{subsystem}_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

const STORE_OPERATION_LATENCY: &str = "account_directory_store_operation_latency_seconds";
const BATCH_WRITE_REQUESTS_TOTAL: &str = "account_directory_batch_write_requests_total";
const BATCH_WRITE_UNPROCESSED_TOTAL: &str = "account_directory_batch_write_unprocessed_total";

// =============================================================================
// Store Metrics
// =============================================================================

/// Records the latency of a directory operation.
#[inline]
pub fn record_operation(operation: &'static str, latency_secs: f64) {
    histogram!(STORE_OPERATION_LATENCY, "operation" => operation).record(latency_secs);
}

// =============================================================================
// Batch Write Metrics
// =============================================================================

/// Records one bulk write request sent to the backend.
#[inline]
pub fn record_batch_write_request(first_attempt: bool) {
    let first_attempt = if first_attempt { "true" } else { "false" };
    counter!(BATCH_WRITE_REQUESTS_TOTAL, "first_attempt" => first_attempt).increment(1);
}

/// Records write requests abandoned after the retry ceiling.
#[inline]
pub fn record_batch_write_unprocessed(count: usize) {
    counter!(BATCH_WRITE_UNPROCESSED_TOTAL).increment(count as u64);
}
