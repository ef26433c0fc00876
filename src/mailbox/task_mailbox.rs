use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::thread::{self, Thread};

use parking_lot::{Condvar, Mutex};

use crate::error::TaskError;
use crate::mailbox::mail::Mail;

/// Observable mailbox states.
///
/// `Quiesced` is a shutdown-drain state: new mail is rejected but the owner
/// thread can still take what is already queued. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxState {
  Open,
  Quiesced,
  Closed,
}

impl fmt::Display for MailboxState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MailboxState::Open => write!(f, "open"),
      MailboxState::Quiesced => write!(f, "quiesced"),
      MailboxState::Closed => write!(f, "closed"),
    }
  }
}

struct Inner<Op> {
  // Min-ordering via Reverse: the heap head is the smallest (priority, seq).
  queue: BinaryHeap<Reverse<Mail<Op>>>,
  state: MailboxState,
}

/// Thread-safe priority mailbox pinned to one consumer thread.
///
/// Any thread may [`put`](Self::put) and [`close`](Self::close); only the
/// thread captured at construction may call the `take` family. Mails are
/// delivered in `(priority, seq_num)` order, so equal-priority mails run in
/// strict submission order and a smaller priority always overtakes a larger
/// one at the next take boundary.
pub struct TaskMailbox<Op> {
  inner: Mutex<Inner<Op>>,
  not_empty: Condvar,
  owner: Thread,
  log_dropped_mail: bool,
}

impl<Op> TaskMailbox<Op> {
  /// Creates a mailbox owned by `owner`. Call sites construct this on the
  /// mailbox thread itself with `thread::current()`.
  pub fn new(owner: Thread, log_dropped_mail: bool) -> Self {
    Self {
      inner: Mutex::new(Inner {
        queue: BinaryHeap::new(),
        state: MailboxState::Open,
      }),
      not_empty: Condvar::new(),
      owner,
      log_dropped_mail,
    }
  }

  /// Non-blocking snapshot; advisory only. Callable from any thread.
  pub fn has_mail(&self) -> bool {
    !self.inner.lock().queue.is_empty()
  }

  /// Current state snapshot. Callable from any thread.
  pub fn state(&self) -> MailboxState {
    self.inner.lock().state
  }

  pub fn is_closed(&self) -> bool {
    self.state() == MailboxState::Closed
  }

  /// Returns the head mail iff its priority is at or above the floor
  /// (`head.priority <= max_priority`). Never blocks.
  ///
  /// # Panics
  ///
  /// Panics when called from any thread other than the owner.
  pub fn try_take(&self, max_priority: i32) -> Option<Mail<Op>> {
    self.check_mailbox_thread();
    let mut inner = self.inner.lock();
    if head_satisfies_floor(&inner.queue, max_priority) {
      inner.queue.pop().map(|Reverse(mail)| mail)
    } else {
      None
    }
  }

  /// Blocks until the head mail satisfies the priority floor, or fails with
  /// [`TaskError::MailboxClosed`] once the mailbox is closed. Tolerates
  /// spurious wake-ups by re-checking the head on every wake.
  ///
  /// # Panics
  ///
  /// Panics when called from any thread other than the owner.
  pub fn take(&self, max_priority: i32) -> Result<Mail<Op>, TaskError> {
    self.check_mailbox_thread();
    let mut inner = self.inner.lock();
    loop {
      if inner.state == MailboxState::Closed {
        return Err(TaskError::MailboxClosed);
      }
      if head_satisfies_floor(&inner.queue, max_priority) {
        if let Some(Reverse(mail)) = inner.queue.pop() {
          return Ok(mail);
        }
      }
      self.not_empty.wait(&mut inner);
    }
  }

  /// Enqueues a mail and wakes one waiting taker. Callable from any thread.
  /// On a quiesced or closed mailbox the mail is dropped (logged at warn
  /// level unless configured silent); producers get fire-and-forget
  /// semantics either way.
  pub fn put(&self, mail: Mail<Op>) {
    let mut inner = self.inner.lock();
    match inner.state {
      MailboxState::Open => {
        tracing::trace!(mail = %mail, "mail enqueued");
        inner.queue.push(Reverse(mail));
        // Signal after enqueue, never before: a waiter woken early would
        // re-check an empty queue and sleep through the real arrival.
        self.not_empty.notify_one();
      }
      state => {
        if self.log_dropped_mail {
          tracing::warn!(mail = %mail, state = %state, "mailbox does not accept mail, dropping");
        }
      }
    }
  }

  /// Stops accepting mail but keeps the queued backlog drainable by the
  /// owner thread. No effect unless the mailbox is open.
  pub fn quiesce(&self) {
    let mut inner = self.inner.lock();
    if inner.state == MailboxState::Open {
      inner.state = MailboxState::Quiesced;
      tracing::debug!("mailbox quiesced");
    }
  }

  /// Terminal transition: drops all queued mails and unblocks every waiting
  /// taker with [`TaskError::MailboxClosed`]. Idempotent; callable from any
  /// thread.
  pub fn close(&self) {
    let mut inner = self.inner.lock();
    if inner.state == MailboxState::Closed {
      return;
    }
    inner.state = MailboxState::Closed;
    let dropped = inner.queue.len();
    inner.queue.clear();
    self.not_empty.notify_all();
    tracing::debug!(dropped_mails = dropped, "mailbox closed");
  }

  fn check_mailbox_thread(&self) {
    check_owner_thread(&self.owner)
  }
}

/// True iff a head mail exists and its priority is at or above the floor.
fn head_satisfies_floor<Op>(queue: &BinaryHeap<Reverse<Mail<Op>>>, max_priority: i32) -> bool {
  queue.peek().map_or(false, |Reverse(head)| head.priority() <= max_priority)
}

fn check_owner_thread(owner: &Thread) {
  let current = thread::current();
  if current.id() != owner.id() {
    panic!(
      "mailbox consumed from wrong thread: expected '{}' ({:?}), called from '{}' ({:?})",
      owner.name().unwrap_or("<unnamed>"),
      owner.id(),
      current.name().unwrap_or("<unnamed>"),
      current.id(),
    );
  }
}
