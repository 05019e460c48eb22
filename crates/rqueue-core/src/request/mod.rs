//! HTTP request queue built on the generic task queue.
//!
//! Each call to [`RequestQueue::request`] becomes one task whose runner sends
//! the request through a [`Transport`] and maps the result onto an
//! [`Outcome`]: success resolves, transient failures are retried after
//! `retry_timeout`, and everything else rejects right away.

mod entry;
mod error;
mod method;

#[cfg(test)]
mod tests;

pub use entry::{RequestEntry, RequestOptions};
pub use error::RequestError;
pub use method::Method;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::queue::{
    BoxFuture, Completion, Outcome, QueueEvents, QueueOptions, QueueStatus, Runner, TaskId,
    TaskQueue, TaskSnapshot, Timer, TokioTimer,
};
use crate::strategy::{Strategy, StrategyKind};
use crate::transport::{Response, Transport, TransportError};

/// Construction options for a [`RequestQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestQueueOptions {
    pub strategy: StrategyKind,
    /// Delay before a transiently failed request becomes eligible again.
    pub retry_timeout: Duration,
    /// Maximum attempts per request, including the first.
    pub max_retries: u32,
    /// Options applied under every request's own options.
    pub defaults: RequestOptions,
}

impl Default for RequestQueueOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            retry_timeout: Duration::from_millis(1000),
            max_retries: 300,
            defaults: RequestOptions::default(),
        }
    }
}

impl RequestQueueOptions {
    fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            wait_time: self.retry_timeout,
            max_attempts: self.max_retries,
        }
    }
}

type RequestTasks = TaskQueue<RequestEntry, Response, RequestError>;

/// Retrying HTTP request queue. Clones share the same queue.
#[derive(Clone)]
pub struct RequestQueue {
    tasks: RequestTasks,
    dispatch: Arc<dyn Runner<RequestEntry, Response, RequestError>>,
    defaults: RequestOptions,
}

impl RequestQueue {
    /// Create a queue using the built-in strategy named in `options`.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, options: RequestQueueOptions) -> Self {
        let strategy = options.strategy.build::<RequestEntry>();
        Self::with_strategy(transport, strategy, options)
    }

    /// Create a queue with a custom strategy; `options.strategy` is ignored.
    pub fn with_strategy(
        transport: Arc<dyn Transport>,
        strategy: Arc<dyn Strategy<RequestEntry>>,
        options: RequestQueueOptions,
    ) -> Self {
        Self::with_timer(transport, strategy, options, Arc::new(TokioTimer))
    }

    pub fn with_timer(
        transport: Arc<dyn Transport>,
        strategy: Arc<dyn Strategy<RequestEntry>>,
        options: RequestQueueOptions,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let tasks = TaskQueue::with_timer(strategy, options.queue_options(), timer);
        Self {
            tasks,
            dispatch: Arc::new(Dispatch { transport }),
            defaults: options.defaults,
        }
    }

    /// Queue a request. The entry is appended before this returns; the
    /// returned future resolves with the response body once the request
    /// succeeds or fails for good.
    pub fn request(
        &self,
        method: impl Into<Method>,
        url: impl Into<String>,
        data: Option<Value>,
        options: RequestOptions,
    ) -> PendingRequest {
        let entry = RequestEntry {
            method: method.into(),
            url: url.into(),
            data,
            options: self.defaults.merge(options),
        };
        tracing::debug!(method = %entry.method, url = %entry.url, "adding request");
        PendingRequest {
            completion: self.tasks.add_shared(entry, Arc::clone(&self.dispatch)),
        }
    }

    pub fn get(&self, url: impl Into<String>) -> PendingRequest {
        self.request(Method::Get, url, None, RequestOptions::default())
    }

    pub fn post(&self, url: impl Into<String>, data: Value) -> PendingRequest {
        self.request(Method::Post, url, Some(data), RequestOptions::default())
    }

    pub fn delete(&self, url: impl Into<String>) -> PendingRequest {
        self.request(Method::Delete, url, None, RequestOptions::default())
    }

    /// Call `callback` with the new queue length after every insertion and
    /// removal, in order. The callback runs on a spawned task; abort the
    /// returned handle to stop listening.
    pub fn on_queue_length_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(usize) + Send + 'static,
    {
        let mut events = self.tasks.subscribe();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                callback(event.length);
            }
        })
    }

    /// Full queue-updated event stream.
    pub fn subscribe(&self) -> QueueEvents {
        self.tasks.subscribe()
    }

    /// Snapshot of the queued requests matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Vec<TaskSnapshot<RequestEntry>>
    where
        F: FnMut(&RequestEntry) -> bool,
    {
        self.tasks.filter(predicate)
    }

    /// Queued requests with the given method and URL whose body passes `data_test`.
    pub fn find<F>(&self, method: &Method, url: &str, mut data_test: F) -> Vec<TaskSnapshot<RequestEntry>>
    where
        F: FnMut(Option<&Value>) -> bool,
    {
        self.tasks
            .filter(|entry| &entry.method == method && entry.url == url && data_test(entry.data.as_ref()))
    }

    pub fn status(&self) -> QueueStatus {
        self.tasks.status()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Future of a queued request's final result.
pub struct PendingRequest {
    completion: Completion<Response, RequestError>,
}

impl PendingRequest {
    pub fn id(&self) -> TaskId {
        self.completion.id()
    }
}

impl Future for PendingRequest {
    type Output = Result<Response, RequestError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().completion)
            .poll(cx)
            .map(|result| result.map_err(RequestError::from))
    }
}

/// Runner shared by every request task of one queue.
struct Dispatch {
    transport: Arc<dyn Transport>,
}

impl Runner<RequestEntry, Response, RequestError> for Dispatch {
    fn run(&self, entry: RequestEntry) -> BoxFuture<Outcome<Response, RequestError>> {
        if !entry.method.is_supported() {
            tracing::debug!(method = %entry.method, url = %entry.url, "unsupported method");
            return Box::pin(std::future::ready(Outcome::failure(
                RequestError::UnsupportedMethod(entry.method.to_string()),
            )));
        }
        let send = self.transport.send(entry.to_transport_request());
        Box::pin(async move {
            tracing::debug!(method = %entry.method, url = %entry.url, "sending request");
            classify(send.await)
        })
    }
}

fn classify(result: Result<Response, TransportError>) -> Outcome<Response, RequestError> {
    match result {
        Ok(response) => Outcome::Success(response),
        Err(TransportError::Transient { status, reason }) => {
            tracing::debug!(status = ?status, %reason, "transient failure");
            Outcome::Retry
        }
        Err(TransportError::Client { status, reason }) => Outcome::Failure {
            error: Some(RequestError::Client { status, reason }),
            code: status,
        },
    }
}
