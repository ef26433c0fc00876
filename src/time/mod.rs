//! Processing-time timers.
//!
//! Timers are registered from any thread and tracked by a dedicated worker
//! thread; a firing never invokes the user callback directly. Instead the
//! worker mails the callback to the owning task at DEFAULT priority, so the
//! callback observes task state on the mailbox thread like everything else.

pub mod system;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MailResult, TaskError};

pub use system::SystemProcessingTimeService;

/// A timer callback. Runs on the mailbox thread with the operator state and
/// the actual firing timestamp (unix millis).
pub type TimerCallback<Op> = Box<dyn FnOnce(&mut Op, u64) -> MailResult + Send>;

/// Clock plus one-shot timer registration.
pub trait ProcessingTimeService<Op> {
  /// Current processing time in unix milliseconds.
  fn current_processing_time(&self) -> u64;

  /// Registers a one-shot timer for `timestamp` (unix millis; a timestamp at
  /// or before now fires immediately). Callable from any thread. Fails once
  /// the service is shut down.
  fn register_timer(&self, timestamp: u64, callback: TimerCallback<Op>) -> Result<TimerHandle, TaskError>;

  /// Stops accepting timers and wakes the worker. In-flight firings may be
  /// dropped.
  fn shutdown(&self);
}

/// Best-effort cancellation handle for a registered timer.
///
/// Cancelling before the firing prevents the mail from being enqueued.
/// Cancelling after the firing but before the mail runs does not stop the
/// mail; idempotence at that point is the callback's responsibility.
#[derive(Debug, Clone)]
pub struct TimerHandle {
  cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
  pub(crate) fn new() -> Self {
    Self {
      cancelled: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Relaxed)
  }
}
