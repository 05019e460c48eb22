pub mod config;
pub mod logging;

pub mod queue;
pub mod request;
pub mod strategy;
pub mod transport;

pub use queue::{Outcome, QueueAction, QueueEvent, QueueOptions, TaskError, TaskQueue};
pub use request::{Method, PendingRequest, RequestError, RequestOptions, RequestQueue, RequestQueueOptions};
pub use strategy::{Strategy, StrategyKind};
pub use transport::{CurlTransport, Response, Transport, TransportError};
