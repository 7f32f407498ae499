//! The transport boundary: anything that can turn a URL into one in-flight
//! request with a single-shot completion.
//!
//! The client only ever talks to a [`Transport`]. Production code plugs in
//! [`HttpTransport`](crate::transport::HttpTransport); tests plug in
//! [`MockTransport`](crate::mock::MockTransport) and trigger completions by hand.

mod network;

pub use self::network::{HttpTask, HttpTransport, HttpTransportBuilder};

use crate::error::BoxError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

/// The handler a task invokes with its [`ResponseEnvelope`].
///
/// Being `FnOnce`, a handler can be called at most once by construction.
pub type CompletionHandler = Box<dyn FnOnce(ResponseEnvelope) + Send + 'static>;

/// A factory for transport tasks.
///
/// # Examples
///
/// ```
/// use dogpatch::transport::{CompletionHandler, Transport, TransportTask};
/// use url::Url;
///
/// // A transport that never reaches the network and never completes.
/// struct Blackhole;
///
/// struct BlackholeTask(Url);
///
/// impl TransportTask for BlackholeTask {
///     fn url(&self) -> &Url { &self.0 }
///     fn start(&self) {}
///     fn cancel(&self) {}
/// }
///
/// impl Transport for Blackhole {
///     type Task = BlackholeTask;
///
///     fn create_task(&self, url: Url, _on_complete: CompletionHandler) -> BlackholeTask {
///         BlackholeTask(url)
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// The handle type returned for each request.
    type Task: TransportTask;

    /// Creates a suspended task targeting `url`.
    ///
    /// The task must not deliver anything to `on_complete` before
    /// [`TransportTask::start`] is called, and must deliver exactly once after.
    fn create_task(&self, url: Url, on_complete: CompletionHandler) -> Self::Task;
}

/// One outstanding request.
pub trait TransportTask {
    /// The resolved target URL.
    fn url(&self) -> &Url;

    /// Begins the operation. Callers invoke this exactly once.
    fn start(&self);

    /// Asks the transport to abandon the operation.
    fn cancel(&self);
}

/// Status metadata of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a head with the given status and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }
}

/// Everything a task hands to its completion handler.
///
/// The three parts are independent: a transport may report a body and an
/// error together, or neither. The client decides what wins.
#[derive(Debug, Default)]
pub struct ResponseEnvelope {
    /// The raw response body.
    pub body: Option<Bytes>,
    /// The response status and headers.
    pub head: Option<ResponseHead>,
    /// A transport-level failure.
    pub error: Option<BoxError>,
}

impl ResponseEnvelope {
    /// Creates an empty envelope: no body, no status, no error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an envelope carrying only a transport error.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::new().with_error(error)
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the status, with empty headers.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.head = Some(ResponseHead::new(status));
        self
    }

    /// Sets the full response head.
    pub fn with_head(mut self, head: ResponseHead) -> Self {
        self.head = Some(head);
        self
    }

    /// Sets the transport error.
    pub fn with_error(mut self, error: impl Into<BoxError>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// The transport error delivered when a task is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Task was cancelled")]
pub struct Cancelled;

/// The transport error delivered when a task's runtime drops it before the
/// exchange finished, for example because the runtime shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Task was abandoned before it completed")]
pub struct Abandoned;
