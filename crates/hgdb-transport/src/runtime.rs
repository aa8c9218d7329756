//! Runtime abstraction layer.
//!
//! Locks and notifications come from `async-lock` and `event-listener` so
//! that transports stay executor-agnostic. Timers and task spawning use
//! Tokio when the `tokio-runtime` feature is enabled.

use std::future::Future;
use std::time::Duration;

/// A runtime-agnostic async mutex.
pub use async_lock::Mutex as AsyncMutex;

/// A runtime-agnostic async `RwLock`.
pub use async_lock::RwLock as AsyncRwLock;

/// A runtime-agnostic event notification mechanism.
pub use event_listener::Event as Notify;

/// Sleep for `duration`.
#[cfg(feature = "tokio-runtime")]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Run `future` with a deadline.
///
/// Returns `None` when the deadline passes first; the future is dropped.
#[cfg(feature = "tokio-runtime")]
pub async fn timeout<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(duration, future).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_expires() {
        let pending = futures::future::pending::<()>();
        assert!(timeout(Duration::from_millis(10), pending).await.is_none());
        assert_eq!(timeout(Duration::from_secs(1), async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_mutex() {
        let m = AsyncMutex::new(1);
        *m.lock().await += 1;
        assert_eq!(*m.lock().await, 2);
    }
}
