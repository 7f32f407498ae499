//! # DogPatch - a callback-based API client
//!
//! DogPatch fetches the dog collection from a remote API, decodes it into
//! typed [`Dog`] records and hands the outcome to a completion callback. The
//! network sits behind the [`Transport`](transport::Transport) trait, so tests
//! can swap in [`MockTransport`](mock::MockTransport) and complete requests by
//! hand, and callbacks can be rerouted onto an [`Executor`](executor::Executor)
//! of your choosing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dogpatch::{executor::SerialQueue, transport::HttpTransport, Client};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dogpatch::Error> {
//!     let responses = Arc::new(SerialQueue::new("responses")?);
//!     let client = Client::new(
//!         "https://example.com/api/v1/",
//!         HttpTransport::new()?,
//!         Some(responses),
//!     )?;
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     client.get_dogs(move |outcome| {
//!         let _ = tx.send(outcome);
//!     });
//!
//!     match rx.await.expect("callback dropped") {
//!         Ok(Some(dogs)) => println!("Found {} dogs", dogs.len()),
//!         Ok(None) => println!("No dogs this time"),
//!         Err(e) => eprintln!("Request failed: {}", e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! A callback receives a [`Fetched`] value, decided in this order:
//!
//! - the transport reported an error: `Err(Error::Transport(_))`, unmodified
//! - the status is not 2xx, or missing: `Ok(None)`
//! - the status is 2xx with a body: the decoded items, or
//!   `Err(Error::DeserializationFailed { .. })`
//! - the status is 2xx without a body: `Ok(None)`

mod client;
mod dog;
mod error;
pub mod executor;
pub mod mock;
pub mod transport;

pub use client::{Client, ClientBuilder, Fetched, DOGS_PATH};
pub use dog::Dog;
pub use error::{BoxError, Error, Result};
