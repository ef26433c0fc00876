//! millstream - a miniature stream-task runtime built around a priority mailbox loop.
//!
//! One dedicated thread (the *mailbox thread*) owns all mutable task state and
//! runs everything that touches it: the per-record default action, timer
//! callbacks, and checkpoint control mails. Satellite threads (producers,
//! the timer service, the checkpoint scheduler) interact with the task only by
//! submitting [`Mail`]s, which the mailbox thread executes in
//! `(priority, submission order)` order.

/// Opaque byte payloads handed to the input gate.
pub mod buffer;
/// Task construction options.
pub mod config;
/// Error types used throughout the runtime.
pub mod error;
/// The input gate: producer-side buffer queue plus the availability signal.
pub mod gate;
/// The priority mailbox, its executors, and the mailbox loop.
pub mod mailbox;
/// Stream-task lifecycle: operator seam, default action, checkpoint scheduler.
pub mod task;
/// Processing-time service: off-thread timers mailed back to the task thread.
pub mod time;

// Re-export the core surface for user convenience, making it accessible
// directly from the crate root (e.g. `millstream::StreamTask`).
pub use buffer::NetworkBuffer;
pub use config::TaskConfig;
pub use error::{BoxError, MailResult, TaskError};
pub use gate::{AvailabilitySignal, InputGate};
pub use mailbox::{
  Mail, MailboxController, MailboxDefaultAction, MailboxExecutor, MailboxProcessor, MailboxState, TaskMailbox,
  DEFAULT_PRIORITY, MIN_PRIORITY,
};
pub use task::{CheckpointScheduler, StreamInputProcessor, StreamOperator, StreamTask};
pub use time::{ProcessingTimeService, SystemProcessingTimeService, TimerCallback, TimerHandle};
