//! Production transport backed by `reqwest`.
//!
//! Each [`HttpTask`] is one GET request driven on a Tokio runtime. The task is
//! created suspended; `start()` spawns the request and the completion handler
//! runs on a runtime worker once the exchange finishes.

use super::{Abandoned, Cancelled, CompletionHandler, ResponseEnvelope, ResponseHead, Transport, TransportTask};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use url::Url;

/// A [`Transport`] that performs real HTTP requests.
///
/// The transport is designed to be reused: it holds a connection pool and is
/// cheap to clone.
///
/// # Examples
///
/// ```no_run
/// use dogpatch::{transport::HttpTransport, Client};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), dogpatch::Error> {
/// let transport = HttpTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "dogpatch/0.1")?
///     .build()?;
///
/// let client = Client::new("https://example.com/api/v1/", transport, None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    http_client: reqwest::Client,
    runtime: Handle,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Creates a transport with default settings on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called outside a Tokio runtime.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }

    /// Creates a new `HttpTransportBuilder`.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }
}

impl Transport for HttpTransport {
    type Task = HttpTask;

    fn create_task(&self, url: Url, on_complete: CompletionHandler) -> HttpTask {
        tracing::debug!(url = %url, "Created HTTP task");

        HttpTask {
            url,
            transport: Arc::clone(&self.inner),
            state: Mutex::new(TaskState::Suspended(on_complete)),
        }
    }
}

enum TaskState {
    Suspended(CompletionHandler),
    CancelledBeforeStart(CompletionHandler),
    Running(Option<oneshot::Sender<()>>),
    Finished,
}

/// A single GET request issued by [`HttpTransport`].
///
/// Dropping the handle does not abort the request; use
/// [`TransportTask::cancel`] for that.
pub struct HttpTask {
    url: Url,
    transport: Arc<HttpTransportInner>,
    state: Mutex<TaskState>,
}

impl HttpTask {
    fn spawn_request(&self, on_complete: CompletionHandler) -> oneshot::Sender<()> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let request = self.build_request();
        let url = self.url.clone();

        let on_complete = DeliveryGuard::new(on_complete);

        self.transport.runtime.spawn(async move {
            let envelope = tokio::select! {
                biased;
                Ok(()) = cancel_rx => {
                    tracing::debug!(url = %url, "HTTP task cancelled");
                    ResponseEnvelope::failed(Cancelled)
                }
                envelope = execute(request, &url) => envelope,
            };
            on_complete.deliver(envelope);
        });

        cancel_tx
    }

    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut request = self.transport.http_client.get(self.url.clone());

        for (name, value) in &self.transport.default_headers {
            request = request.header(name, value);
        }

        if let Some(timeout) = self.transport.timeout {
            request = request.timeout(timeout);
        }

        request
    }
}

impl TransportTask for HttpTask {
    fn url(&self) -> &Url {
        &self.url
    }

    fn start(&self) {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, TaskState::Finished) {
            TaskState::Suspended(on_complete) => {
                *state = TaskState::Running(Some(self.spawn_request(on_complete)));
            }
            TaskState::CancelledBeforeStart(on_complete) => {
                let on_complete = DeliveryGuard::new(on_complete);
                self.transport
                    .runtime
                    .spawn(async move { on_complete.deliver(ResponseEnvelope::failed(Cancelled)) });
            }
            previous => {
                tracing::warn!(url = %self.url, "start() called on a task that was already started");
                *state = previous;
            }
        }
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, TaskState::Finished) {
            TaskState::Suspended(on_complete) => {
                *state = TaskState::CancelledBeforeStart(on_complete);
            }
            TaskState::Running(Some(cancel_tx)) => {
                // The receiver is gone once the request finished on its own.
                let _ = cancel_tx.send(());
                *state = TaskState::Running(None);
            }
            previous => *state = previous,
        }
    }
}

/// Owns a completion handler inside a spawned future.
///
/// If the future is dropped before delivering, which happens when the runtime
/// shuts down, the handler still runs once with an [`Abandoned`] error.
struct DeliveryGuard(Option<CompletionHandler>);

impl DeliveryGuard {
    fn new(on_complete: CompletionHandler) -> Self {
        Self(Some(on_complete))
    }

    fn deliver(mut self, envelope: ResponseEnvelope) {
        if let Some(on_complete) = self.0.take() {
            on_complete(envelope);
        }
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if let Some(on_complete) = self.0.take() {
            tracing::warn!("HTTP task dropped by its runtime before completing");
            on_complete(ResponseEnvelope::failed(Abandoned));
        }
    }
}

async fn execute(request: reqwest::RequestBuilder, url: &Url) -> ResponseEnvelope {
    let start_time = Instant::now();
    tracing::debug!(method = "GET", url = %url, "Executing HTTP request");

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, url = %url, "HTTP request failed");
            return ResponseEnvelope::failed(e);
        }
    };

    let head = ResponseHead {
        status: response.status(),
        headers: response.headers().clone(),
    };

    tracing::info!(
        status = head.status.as_u16(),
        latency_ms = start_time.elapsed().as_millis(),
        "Received HTTP response"
    );

    match response.bytes().await {
        Ok(body) => ResponseEnvelope::new().with_head(head).with_body(body),
        Err(e) => {
            tracing::debug!(error = %e, url = %url, "Failed to read response body");
            ResponseEnvelope::new().with_head(head).with_error(e)
        }
    }
}

/// Builder for configuring and creating an [`HttpTransport`].
pub struct HttpTransportBuilder {
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    runtime: Option<Handle>,
}

impl HttpTransportBuilder {
    /// Creates a new `HttpTransportBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            timeout: None,
            runtime: None,
        }
    }

    /// Adds a header that will be included in every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the runtime requests are driven on.
    ///
    /// Defaults to the runtime that is current when [`build`](Self::build) runs.
    /// Tasks started after that runtime shuts down, or still running when it
    /// does, complete with an [`Abandoned`] transport error.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the configured `HttpTransport`.
    ///
    /// # Errors
    ///
    /// Returns an error if no runtime was provided and none is current, or if
    /// the underlying HTTP client cannot be built.
    pub fn build(self) -> Result<HttpTransport> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                Error::ConfigurationError(format!("No Tokio runtime available: {}", e))
            })?,
        };

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(HttpTransport {
            inner: Arc::new(HttpTransportInner {
                http_client,
                runtime,
                default_headers: self.default_headers,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
