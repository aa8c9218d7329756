//! Async testing utilities.
//!
//! Timeout wrappers so a hung session fails a test instead of stalling it,
//! and a polling helper for state that settles asynchronously.

use std::future::Future;
use std::time::Duration;

/// Default timeout for async operations in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between checks in [`wait_until`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run a future with a timeout.
///
/// # Panics
///
/// Panics if the future does not complete within the timeout.
///
/// # Example
///
/// ```rust,ignore
/// use hgdb_testing::async_helpers::with_timeout;
/// use std::time::Duration;
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(Duration::from_secs(1), async { 7 }).await;
///     assert_eq!(result, 7);
/// }
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("Test timed out")
}

/// Run a future with [`DEFAULT_TIMEOUT`].
pub async fn with_default_timeout<T, F>(future: F) -> T
where
    F: Future<Output = T>,
{
    with_timeout(DEFAULT_TIMEOUT, future).await
}

/// Assert that a future does not complete within `timeout`.
///
/// # Panics
///
/// Panics if the future completes first.
pub async fn assert_times_out<T, F>(timeout: Duration, future: F)
where
    F: Future<Output = T>,
{
    let result = tokio::time::timeout(timeout, future).await;
    assert!(
        result.is_err(),
        "Expected operation to timeout, but it completed"
    );
}

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition does not hold within `timeout`.
pub async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    with_timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;
}
