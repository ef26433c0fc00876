use std::time::Duration;

/// Construction-time options for a [`StreamTask`](crate::StreamTask).
///
/// Plain named options consumed once at construction; no environment
/// variables, no CLI, no persisted state.
#[derive(Debug, Clone)]
pub struct TaskConfig {
  /// Period between checkpoint scheduler ticks. `None` disables the
  /// scheduler entirely (checkpoints can still be injected manually through
  /// the control executor).
  pub checkpoint_interval: Option<Duration>,
  /// When `true` (the default) the timer worker thread is detached on
  /// shutdown; it still wakes up and exits promptly, but `shutdown()` does
  /// not wait for it. When `false`, `shutdown()` joins the worker.
  pub timer_thread_daemon: bool,
  /// Whether `put` on a closed (or quiesced) mailbox logs the dropped mail
  /// at warn level, or drops it silently.
  pub log_dropped_mail: bool,
}

impl Default for TaskConfig {
  fn default() -> Self {
    Self {
      checkpoint_interval: None,
      timer_thread_daemon: true,
      log_dropped_mail: true,
    }
  }
}
