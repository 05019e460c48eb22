//! Injected timing source for retry waits.
//!
//! The queue never touches tokio's timer directly; it asks a `Timer` so tests
//! and embedders can control when a backoff wait elapses.

use std::time::Duration;

use super::BoxFuture;

/// Source of delayed wake-ups.
pub trait Timer: Send + Sync + 'static {
    /// Future that completes once `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<()>;
}

/// Default timer backed by `tokio::time::sleep`.
///
/// Honors tokio's paused clock, so `#[tokio::test(start_paused = true)]`
/// makes retry waits deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
