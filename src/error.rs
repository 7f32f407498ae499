//! Error types delivered to completion callbacks.
//!
//! The client never translates the errors it receives. A transport failure is
//! handed over exactly as the transport reported it, and a decode failure keeps
//! the original `serde_json::Error` so callers can inspect its category.

use http::StatusCode;
use serde_json::error::Category;

/// A boxed, thread-safe error produced by a transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the DogPatch client.
///
/// # Examples
///
/// ```
/// use dogpatch::Error;
///
/// fn describe(outcome: dogpatch::Result<Option<Vec<dogpatch::Dog>>>) -> String {
///     match outcome {
///         Ok(Some(dogs)) => format!("{} dogs", dogs.len()),
///         Ok(None) => "no dogs this time".to_string(),
///         Err(Error::Transport(e)) => format!("network trouble: {}", e),
///         Err(Error::DeserializationFailed { serde_error, .. }) => {
///             format!("bad payload: {}", serde_error)
///         }
///         Err(e) => e.to_string(),
///     }
/// }
///
/// assert_eq!(describe(Ok(None)), "no dogs this time");
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport failed to complete the exchange (connection refused,
    /// DNS failure, cancellation, ...).
    ///
    /// The wrapped value is the transport's own error, unmodified. Use
    /// [`Error::transport_error`] and `downcast_ref` to recover the concrete type.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// A successful response carried a body that is not a valid collection.
    ///
    /// Decoding is all-or-nothing: one malformed element fails the whole
    /// collection.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body, lossily converted to UTF-8
        raw_response: String,
        /// The decoder's error
        #[source]
        serde_error: serde_json::Error,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided while building a client or transport.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Wraps any transport error without altering it.
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Error::Transport(error.into())
    }

    /// Returns `true` if the transport reported the failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns `true` if the response body failed to decode.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::DeserializationFailed { .. })
    }

    /// Returns the transport's original error, if this is a transport failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogpatch::{transport::Cancelled, Error};
    ///
    /// let err = Error::transport(Cancelled);
    /// assert!(err
    ///     .transport_error()
    ///     .and_then(|e| e.downcast_ref::<Cancelled>())
    ///     .is_some());
    /// ```
    pub fn transport_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Returns the category of a decode failure.
    ///
    /// Two decode errors describe the same problem when their categories
    /// match; messages and positions are not compared.
    pub fn decode_category(&self) -> Option<Category> {
        match self {
            Error::DeserializationFailed { serde_error, .. } => Some(serde_error.classify()),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for the DogPatch client.
pub type Result<T> = std::result::Result<T, Error>;
