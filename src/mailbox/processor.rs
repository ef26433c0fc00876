use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TaskError;
use crate::mailbox::executor::MailboxExecutor;
use crate::mailbox::mail::Mail;
use crate::mailbox::task_mailbox::TaskMailbox;

/// Priority of control mails (checkpoints, resume-default-action).
pub const MIN_PRIORITY: i32 = 0;
/// Priority of data and timer mails.
pub const DEFAULT_PRIORITY: i32 = 1;

/// The per-iteration "try to make progress on data" step of a task.
///
/// Implementations must not loop or block internally: process at most one
/// unit of work and return, or suspend through the controller after arranging
/// a resume. The mailbox loop calls the action again on the next iteration.
pub trait MailboxDefaultAction<Op> {
  fn run_default_action(&mut self, op: &mut Op, controller: &MailboxController<Op>) -> Result<(), TaskError>;
}

/// Suspend/resume capability for the default action.
///
/// `suspend_default_action` is meant for the task thread (inside the default
/// action); `resume_default_action` is the only supported cross-thread way to
/// re-arm the loop and is safe to call from anywhere, because it merely puts
/// a control mail.
pub struct MailboxController<Op> {
  mailbox: Arc<TaskMailbox<Op>>,
  default_action_available: Arc<AtomicBool>,
}

impl<Op> Clone for MailboxController<Op> {
  fn clone(&self) -> Self {
    Self {
      mailbox: Arc::clone(&self.mailbox),
      default_action_available: Arc::clone(&self.default_action_available),
    }
  }
}

impl<Op> MailboxController<Op> {
  /// Stops the loop from invoking the default action until a resume mail
  /// flips the flag back. Idempotent within one iteration.
  pub fn suspend_default_action(&self) {
    // The flag is only ever written by the task thread (here, and inside the
    // resume mail body); Relaxed suffices, ordering comes from the mailbox
    // mutex.
    self.default_action_available.store(false, Ordering::Relaxed);
    tracing::trace!("default action suspended");
  }

  /// Re-arms the default action by posting a MIN-priority mail whose body
  /// sets the availability flag. Callable from any thread.
  pub fn resume_default_action(&self) {
    let flag = Arc::clone(&self.default_action_available);
    self.mailbox.put(Mail::new(
      move |_op: &mut Op| {
        flag.store(true, Ordering::Relaxed);
        Ok(())
      },
      MIN_PRIORITY,
      "resume-default-action",
    ));
  }

  pub fn is_default_action_available(&self) -> bool {
    self.default_action_available.load(Ordering::Relaxed)
  }
}

/// The single-threaded mailbox loop.
///
/// Each iteration drains *all* control-priority mails, then either runs the
/// default action or, when it is suspended, parks in a blocking take at
/// DEFAULT priority until any mail arrives. The drain-first rule is what
/// guarantees a pending checkpoint executes before the next record.
pub struct MailboxProcessor<Op> {
  mailbox: Arc<TaskMailbox<Op>>,
  main_executor: MailboxExecutor<Op>,
  controller: MailboxController<Op>,
}

impl<Op> MailboxProcessor<Op> {
  pub fn new(mailbox: Arc<TaskMailbox<Op>>) -> Self {
    let main_executor = MailboxExecutor::new(Arc::clone(&mailbox), DEFAULT_PRIORITY);
    let controller = MailboxController {
      mailbox: Arc::clone(&mailbox),
      default_action_available: Arc::new(AtomicBool::new(true)),
    };
    Self {
      mailbox,
      main_executor,
      controller,
    }
  }

  /// The DEFAULT-priority executor bound to this processor's mailbox.
  pub fn main_executor(&self) -> MailboxExecutor<Op> {
    self.main_executor.clone()
  }

  pub fn controller(&self) -> MailboxController<Op> {
    self.controller.clone()
  }

  /// Runs the loop on the mailbox thread until the mailbox closes (normal
  /// exit) or a mail / the default action fails (the error propagates and
  /// terminates the task).
  pub fn run_mailbox_loop<A>(&self, op: &mut Op, default_action: &mut A) -> Result<(), TaskError>
  where
    A: MailboxDefaultAction<Op>,
  {
    tracing::debug!("mailbox loop started");
    loop {
      while let Some(mail) = self.mailbox.try_take(MIN_PRIORITY) {
        self.run_mail(mail, op)?;
      }
      // A closed mailbox ends the task even when the default action could
      // still make progress; records enqueued after close() are not observed.
      if self.mailbox.is_closed() {
        tracing::debug!("mailbox closed, leaving loop");
        return Ok(());
      }
      if self.controller.is_default_action_available() {
        default_action.run_default_action(op, &self.controller)?;
      } else {
        match self.mailbox.take(DEFAULT_PRIORITY) {
          Ok(mail) => self.run_mail(mail, op)?,
          Err(TaskError::MailboxClosed) => {
            tracing::debug!("mailbox closed while suspended, leaving loop");
            return Ok(());
          }
          Err(other) => return Err(other),
        }
      }
    }
  }

  fn run_mail(&self, mail: Mail<Op>, op: &mut Op) -> Result<(), TaskError> {
    tracing::trace!(mail = %mail, "running mail");
    let label = mail.label().to_owned();
    mail.run(op).map_err(|source| TaskError::MailFailed { label, source })
  }
}
