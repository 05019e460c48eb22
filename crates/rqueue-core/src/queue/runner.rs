//! Runner seam: how a queued payload becomes one attempt.

use std::future::Future;
use std::pin::Pin;

use super::Outcome;

/// Owned, sendable future used at the crate's async seams.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Performs one attempt for a payload.
///
/// The queue calls `run` once per admitted attempt with a clone of the task's
/// payload and spawns the returned future.
pub trait Runner<P, T, E>: Send + Sync + 'static {
    fn run(&self, payload: P) -> BoxFuture<Outcome<T, E>>;
}

impl<P, T, E, F, Fut> Runner<P, T, E> for F
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<T, E>> + Send + 'static,
{
    fn run(&self, payload: P) -> BoxFuture<Outcome<T, E>> {
        Box::pin(self(payload))
    }
}
