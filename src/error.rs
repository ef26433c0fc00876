use thiserror::Error;

/// Boxed error type carried by user callbacks (mail bodies, record
/// processing, timer callbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by mail bodies and operator callbacks.
pub type MailResult = Result<(), BoxError>;

/// Terminal conditions of the stream-task runtime.
///
/// Anything that fails on the mailbox thread fails the task; cross-thread
/// producers never see errors from the consumer side (`put` is
/// fire-and-forget). A `take`/`try_take` call from the wrong thread is a
/// programmer error and panics instead of returning a variant here.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TaskError {
  /// Observed by a blocked `take` after `close()`. Expected at shutdown;
  /// the mailbox loop converts it into a normal exit.
  #[error("mailbox is closed")]
  MailboxClosed,

  /// The callable inside a mail raised. Propagates out of the mailbox loop
  /// and hence out of `invoke()`; no automatic retry. Checkpoint and timer
  /// mails fail the task the same way.
  #[error("mail '{label}' failed")]
  MailFailed {
    label: String,
    #[source]
    source: BoxError,
  },

  /// `process_record` raised while handling an input buffer.
  #[error("record processing failed")]
  RecordProcessing(#[source] BoxError),

  /// `register_timer` was called after the processing-time service shut down.
  #[error("processing-time service is shut down")]
  TimerServiceShutdown,

  /// The runtime could not bring up one of its satellite threads (timer
  /// worker, checkpoint scheduler). Surfaces from task construction or
  /// `invoke()` before any user work has run.
  #[error("internal runtime error: {0}")]
  Internal(String),
}
