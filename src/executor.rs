//! Response executors: where completion callbacks run.
//!
//! A client configured with an [`Executor`] submits every callback to it
//! instead of running it on whatever thread the transport completed on.

use crate::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A unit of work submitted to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs on a context of its choosing.
pub trait Executor: Send + Sync {
    /// Schedules `job` to run later. Must not run it inline.
    fn submit(&self, job: Job);
}

/// A serial queue backed by one dedicated, named thread.
///
/// Jobs run one at a time in submission order. A job that panics is logged
/// and does not stop later jobs. The thread exits once the queue is dropped
/// and every pending job has run.
///
/// # Examples
///
/// ```
/// use dogpatch::executor::{Executor, SerialQueue};
/// use std::sync::mpsc;
///
/// let queue = SerialQueue::new("responses").unwrap();
/// let (tx, rx) = mpsc::channel();
///
/// queue.submit(Box::new(move || {
///     tx.send(std::thread::current().name().map(str::to_owned)).unwrap();
/// }));
///
/// assert_eq!(rx.recv().unwrap().as_deref(), Some("responses"));
/// ```
pub struct SerialQueue {
    label: String,
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    /// Spawns the queue's thread, named after `label`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the thread cannot be spawned.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        std::thread::Builder::new()
            .name(label.clone())
            .spawn({
                let label = label.clone();
                move || {
                    while let Some(job) = receiver.blocking_recv() {
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!(label = %label, "Job panicked on serial queue");
                        }
                    }
                }
            })
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to spawn response queue: {}", e))
            })?;

        tracing::debug!(label = %label, "Started serial response queue");

        Ok(Self { label, sender })
    }

    /// The queue's label, which is also its thread's name.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Executor for SerialQueue {
    fn submit(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::warn!(label = %self.label, "Serial queue is closed, dropping job");
        }
    }
}

/// Runs each job as a task on a Tokio runtime.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Creates an executor spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates an executor spawning onto the current runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when called outside a Tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| Error::ConfigurationError(format!("No Tokio runtime available: {}", e)))
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Runs `job` on `executor`, or inline when there is none.
pub(crate) fn dispatch(executor: Option<&dyn Executor>, job: impl FnOnce() + Send + 'static) {
    match executor {
        Some(executor) => executor.submit(Box::new(job)),
        None => job(),
    }
}
