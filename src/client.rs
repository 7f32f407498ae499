//! The DogPatch API client.
//!
//! The [`Client`] type is the main entry point. It resolves request URLs,
//! asks its [`Transport`] for a task, starts it, and turns the task's single
//! [`ResponseEnvelope`] into a result for the caller's callback.

use crate::{
    executor::{dispatch, Executor},
    transport::{CompletionHandler, ResponseEnvelope, Transport, TransportTask},
    Dog, Error, Result,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Relative path of the dog collection.
pub const DOGS_PATH: &str = "dogs";

/// What a completion callback receives.
///
/// * `Ok(Some(items))` - a successful response decoded into `items`
/// * `Ok(None)` - no data and no error (non-success status, or no body)
/// * `Err(error)` - a transport failure or a decode failure
pub type Fetched<D> = Result<Option<Vec<D>>>;

/// A callback-based client for the DogPatch API.
///
/// The client is cheap to clone; clones share the transport and executor.
///
/// # Examples
///
/// ```no_run
/// use dogpatch::{executor::SerialQueue, transport::HttpTransport, Client};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), dogpatch::Error> {
/// let client = Client::builder()
///     .base_url("https://example.com/api/v1/")?
///     .transport(HttpTransport::new()?)
///     .response_executor(Arc::new(SerialQueue::new("ui")?))
///     .build()?;
///
/// client.get_dogs(|outcome| match outcome {
///     Ok(Some(dogs)) => println!("{} dogs", dogs.len()),
///     Ok(None) => println!("no dogs this time"),
///     Err(e) => eprintln!("failed: {}", e),
/// });
/// # Ok(())
/// # }
/// ```
pub struct Client<T> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    base_url: Url,
    dogs_url: Url,
    transport: T,
    response_executor: Option<Arc<dyn Executor>>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client.
    ///
    /// With `response_executor` set, every callback is submitted to it;
    /// otherwise callbacks run inline wherever the transport completes.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL that can serve as
    /// a base for relative paths.
    pub fn new(
        base_url: impl AsRef<str>,
        transport: T,
        response_executor: Option<Arc<dyn Executor>>,
    ) -> Result<Self> {
        let builder = ClientBuilder::new().base_url(base_url)?.transport(transport);
        match response_executor {
            Some(executor) => builder.response_executor(executor).build(),
            None => builder.build(),
        }
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder<T> {
        ClientBuilder::new()
    }

    /// The API root all request URLs are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The transport this client creates tasks with.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// The executor callbacks are delivered on, if any.
    pub fn response_executor(&self) -> Option<&Arc<dyn Executor>> {
        self.inner.response_executor.as_ref()
    }

    /// Fetches the dog collection from `<base_url>/dogs`.
    ///
    /// Exactly one task is created and started. The returned handle may be
    /// ignored or used to cancel; `on_complete` runs once either way.
    pub fn get_dogs<F>(&self, on_complete: F) -> T::Task
    where
        F: FnOnce(Fetched<Dog>) + Send + 'static,
    {
        self.start_task(self.inner.dogs_url.clone(), on_complete)
    }

    /// Fetches a JSON array from `path`, resolved against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be resolved into a URL. In that case
    /// no task is created and `on_complete` is never called.
    pub fn fetch_collection<D, F>(&self, path: &str, on_complete: F) -> Result<T::Task>
    where
        D: DeserializeOwned + Send + 'static,
        F: FnOnce(Fetched<D>) + Send + 'static,
    {
        let url = self.inner.base_url.join(path)?;
        Ok(self.start_task(url, on_complete))
    }

    fn start_task<D, F>(&self, url: Url, on_complete: F) -> T::Task
    where
        D: DeserializeOwned + Send + 'static,
        F: FnOnce(Fetched<D>) + Send + 'static,
    {
        let executor = self.inner.response_executor.clone();
        let handler: CompletionHandler = Box::new(move |envelope| {
            let outcome = classify::<D>(envelope);
            dispatch(executor.as_deref(), move || on_complete(outcome));
        });

        let task = self.inner.transport.create_task(url, handler);
        tracing::debug!(url = %task.url(), "Starting transport task");
        task.start();
        task
    }
}

/// Decides what a callback receives for `envelope`.
///
/// A transport error always wins. Without one, anything but a success status
/// yields no data and no error; a success status with a body is decoded.
pub(crate) fn classify<D: DeserializeOwned>(envelope: ResponseEnvelope) -> Fetched<D> {
    if let Some(error) = envelope.error {
        return Err(Error::Transport(error));
    }

    let status = match envelope.head {
        Some(head) if head.status.is_success() => head.status,
        Some(head) => {
            tracing::debug!(status = head.status.as_u16(), "Non-success response, no data");
            return Ok(None);
        }
        None => {
            tracing::debug!("Response without status, no data");
            return Ok(None);
        }
    };

    let Some(body) = envelope.body else {
        return Ok(None);
    };

    match serde_json::from_slice::<Vec<D>>(&body) {
        Ok(items) => Ok(Some(items)),
        Err(e) => {
            let raw_response = String::from_utf8_lossy(&body).into_owned();
            tracing::warn!(
                error = %e,
                raw_response = %raw_response,
                "Failed to deserialize response"
            );

            Err(Error::DeserializationFailed {
                raw_response,
                serde_error: e,
                status,
            })
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```
/// use dogpatch::{mock::MockTransport, ClientBuilder};
///
/// # fn example() -> Result<(), dogpatch::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://example.com/api/v1/")?
///     .transport(MockTransport::new())
///     .build()?;
/// assert_eq!(client.base_url().as_str(), "https://example.com/api/v1/");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ClientBuilder<T> {
    base_url: Option<Url>,
    transport: Option<T>,
    response_executor: Option<Arc<dyn Executor>>,
}

impl<T: Transport> ClientBuilder<T> {
    /// Creates a new `ClientBuilder` with nothing configured.
    pub fn new() -> Self {
        Self {
            base_url: None,
            transport: None,
            response_executor: None,
        }
    }

    /// Sets the API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot be a base.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot be used as a base: {}",
                url
            )));
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the transport.
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the executor every callback is delivered on.
    pub fn response_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.response_executor = Some(executor);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or transport is missing.
    pub fn build(self) -> Result<Client<T>> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;
        let transport = self
            .transport
            .ok_or_else(|| Error::ConfigurationError("Transport is required".to_string()))?;
        let dogs_url = base_url.join(DOGS_PATH)?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                dogs_url,
                transport,
                response_executor: self.response_executor,
            }),
        })
    }
}

impl<T: Transport> Default for ClientBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
