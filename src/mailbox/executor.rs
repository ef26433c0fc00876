use std::sync::Arc;

use crate::error::MailResult;
use crate::mailbox::mail::Mail;
use crate::mailbox::task_mailbox::TaskMailbox;

/// A cheap, cloneable capability handle binding "submit to this mailbox" with
/// a fixed priority.
///
/// Two handles are typically in circulation per task: the main executor
/// (DEFAULT priority, for timers and anything hopping back onto the task
/// thread) and a control executor (MIN priority, for checkpoints and other
/// work that must preempt data processing). Handles may be handed to any
/// producer thread.
pub struct MailboxExecutor<Op> {
  mailbox: Arc<TaskMailbox<Op>>,
  priority: i32,
}

impl<Op> Clone for MailboxExecutor<Op> {
  fn clone(&self) -> Self {
    Self {
      mailbox: Arc::clone(&self.mailbox),
      priority: self.priority,
    }
  }
}

impl<Op> MailboxExecutor<Op> {
  pub fn new(mailbox: Arc<TaskMailbox<Op>>, priority: i32) -> Self {
    Self { mailbox, priority }
  }

  pub fn priority(&self) -> i32 {
    self.priority
  }

  /// Wraps `action` in a mail at this executor's priority and submits it.
  /// Fire-and-forget: if the mailbox no longer accepts mail the submission
  /// is dropped on the consumer side.
  pub fn execute<F>(&self, action: F, label: impl Into<String>)
  where
    F: FnOnce(&mut Op) -> MailResult + Send + 'static,
  {
    self.mailbox.put(Mail::new(action, self.priority, label));
  }
}
