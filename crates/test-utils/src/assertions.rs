//! Test assertion helpers.
//!
//! Provides polling-based assertions for async test scenarios.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls a condition until it returns true or the timeout expires.
///
/// Use it for state that converges in the background, such as the
/// migration retry queue draining, instead of fixed sleeps.
///
/// # Arguments
///
/// * `timeout` - Maximum wait duration
/// * `condition` - Closure returning `true` when the expected state holds
///
/// # Returns
///
/// `true` if the condition became true before timeout, `false` otherwise.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use account_directory_test_utils::{TestDirectory, assert_eventually};
///
/// #[tokio::test]
/// async fn test_retry_queue_drains() {
///     let dir = TestDirectory::new();
///     let retries = dir.store.retries().clone();
///
///     // ... start a re-drive in the background ...
///
///     let drained = assert_eventually(Duration::from_secs(1), || {
///         retries.uuids(1).map(|u| u.is_empty()).unwrap_or(false)
///     })
///     .await;
///     assert!(drained, "retry queue should drain");
/// }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    // Final check after timeout
    condition()
}
