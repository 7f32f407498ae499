//! A deterministic transport for tests.
//!
//! [`MockTransport`] never touches the network. Each task it creates stores
//! its completion handler until the test calls [`MockTask::complete`], which
//! runs the handler synchronously on the calling thread.
//!
//! ```
//! use dogpatch::mock::MockTransport;
//! use dogpatch::transport::ResponseEnvelope;
//! use dogpatch::Client;
//! use http::StatusCode;
//! use std::sync::{Arc, Mutex};
//!
//! let client = Client::new("https://example.com/api/v1/", MockTransport::new(), None).unwrap();
//!
//! let received = Arc::new(Mutex::new(None));
//! let slot = Arc::clone(&received);
//! let task = client.get_dogs(move |outcome| {
//!     *slot.lock().unwrap() = Some(outcome.is_ok());
//! });
//!
//! assert!(task.called_start());
//! task.complete(ResponseEnvelope::new().with_status(StatusCode::INTERNAL_SERVER_ERROR));
//! assert_eq!(*received.lock().unwrap(), Some(true));
//! ```

use crate::transport::{CompletionHandler, ResponseEnvelope, Transport, TransportTask};
use parking_lot::Mutex;
use std::sync::Arc;
use url::Url;

/// A transport whose tasks complete only when told to.
///
/// Clones share the same request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<Url>>>,
}

impl MockTransport {
    /// Creates a transport with an empty request log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every URL a task was created for, in order.
    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }

    /// Returns how many tasks have been created.
    pub fn task_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for MockTransport {
    type Task = MockTask;

    fn create_task(&self, url: Url, on_complete: CompletionHandler) -> MockTask {
        self.requests.lock().push(url.clone());

        MockTask {
            url,
            state: Arc::new(Mutex::new(MockTaskState {
                on_complete: Some(on_complete),
                start_count: 0,
                cancelled: false,
            })),
        }
    }
}

struct MockTaskState {
    on_complete: Option<CompletionHandler>,
    start_count: usize,
    cancelled: bool,
}

/// A task created by [`MockTransport`].
///
/// Clones observe and drive the same task.
#[derive(Clone)]
pub struct MockTask {
    url: Url,
    state: Arc<Mutex<MockTaskState>>,
}

impl MockTask {
    /// Returns `true` once `start()` has been called.
    pub fn called_start(&self) -> bool {
        self.start_count() > 0
    }

    /// Returns how many times `start()` has been called.
    pub fn start_count(&self) -> usize {
        self.state.lock().start_count
    }

    /// Returns `true` once `cancel()` has been called.
    pub fn was_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Returns `true` once the completion handler has run.
    pub fn is_completed(&self) -> bool {
        self.state.lock().on_complete.is_none()
    }

    /// Delivers `envelope` to the stored completion handler, inline.
    ///
    /// # Panics
    ///
    /// Panics if the task was never started or was already completed.
    pub fn complete(&self, envelope: ResponseEnvelope) {
        let on_complete = {
            let mut state = self.state.lock();
            assert!(state.start_count > 0, "MockTask for {} completed before start()", self.url);
            state
                .on_complete
                .take()
                .unwrap_or_else(|| panic!("MockTask for {} completed more than once", self.url))
        };

        on_complete(envelope);
    }
}

impl TransportTask for MockTask {
    fn url(&self) -> &Url {
        &self.url
    }

    fn start(&self) {
        self.state.lock().start_count += 1;
    }

    fn cancel(&self) {
        self.state.lock().cancelled = true;
    }
}
