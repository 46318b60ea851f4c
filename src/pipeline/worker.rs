//! Running an operation off the calling thread.
//!
//! The [`Processor`] moves into a worker thread for the duration of one
//! operation and is handed back on completion. The caller keeps a
//! [`CancelToken`] that is honoured between pipeline stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

use super::processor::{Operation, Processor};

/// Shared flag asking an in-progress operation to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Stages already running finish first.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] once cancellation was requested.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            tracing::info!("Processing cancelled");
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a finished task hands back.
pub struct Completed {
    /// The processor, holding the new result on success.
    pub processor: Processor,
    /// Which operation ran.
    pub operation: Operation,
    /// How it went.
    pub outcome: Result<()>,
}

/// An operation running on a worker thread.
pub struct Task {
    cancel: CancelToken,
    handle: JoinHandle<Completed>,
}

impl Task {
    /// Start `operation` on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(processor: Processor, operation: Operation) -> Result<Self> {
        Self::spawn_with(processor, operation, |_| {})
    }

    /// Start `operation` and call `on_complete` on the worker thread when it
    /// finishes, before the result becomes joinable.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_with<F>(mut processor: Processor, operation: Operation, on_complete: F) -> Result<Self>
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("chromalift-worker".to_string())
            .spawn(move || {
                let outcome = processor
                    .process_with_cancel(operation, &token)
                    .map(|_| ());
                on_complete(&outcome);
                Completed {
                    processor,
                    operation,
                    outcome,
                }
            })?;

        Ok(Self { cancel, handle })
    }

    /// A handle for cancelling this task from elsewhere.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation between stages.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task and take back the processor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if the worker thread panicked.
    pub fn join(self) -> Result<Completed> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}
