use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{self, AtomicU64};

use crate::error::MailResult;

/// Process-global monotonic sequence counter. Ties between equal priorities
/// are broken by submission order; 64 bits keeps overflow out of reach.
static SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The callable carried by a mail. It runs on the mailbox thread and receives
/// the operator state by mutable reference, which is what confines all state
/// access to that one thread without any locking.
pub type MailAction<Op> = Box<dyn FnOnce(&mut Op) -> MailResult + Send>;

/// A unit of scheduled work: a fallible callable plus a priority (smaller =
/// higher precedence), a process-unique monotonic sequence number, and a
/// human-readable label for logs.
///
/// Ordering is lexicographic `(priority asc, seq_num asc)`, so equal-priority
/// mails run in submission order.
pub struct Mail<Op> {
  action: MailAction<Op>,
  priority: i32,
  seq_num: u64,
  label: String,
}

impl<Op> Mail<Op> {
  pub fn new<F>(action: F, priority: i32, label: impl Into<String>) -> Self
  where
    F: FnOnce(&mut Op) -> MailResult + Send + 'static,
  {
    Self {
      action: Box::new(action),
      priority,
      seq_num: SEQ_COUNTER.fetch_add(1, atomic::Ordering::Relaxed),
      label: label.into(),
    }
  }

  pub fn priority(&self) -> i32 {
    self.priority
  }

  pub fn seq_num(&self) -> u64 {
    self.seq_num
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  /// Runs the mail body, consuming the mail.
  pub fn run(self, op: &mut Op) -> MailResult {
    (self.action)(op)
  }
}

impl<Op> fmt::Display for Mail<Op> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} (priority={}, seq={})", self.label, self.priority, self.seq_num)
  }
}

impl<Op> fmt::Debug for Mail<Op> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mail")
      .field("label", &self.label)
      .field("priority", &self.priority)
      .field("seq_num", &self.seq_num)
      .finish()
  }
}

impl<Op> PartialEq for Mail<Op> {
  fn eq(&self, other: &Self) -> bool {
    self.priority == other.priority && self.seq_num == other.seq_num
  }
}

impl<Op> Eq for Mail<Op> {}

impl<Op> PartialOrd for Mail<Op> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<Op> Ord for Mail<Op> {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .priority
      .cmp(&other.priority)
      .then_with(|| self.seq_num.cmp(&other.seq_num))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn noop(priority: i32) -> Mail<()> {
    Mail::new(|_| Ok(()), priority, "noop")
  }

  #[test]
  fn seq_numbers_are_strictly_increasing() {
    let a = noop(1);
    let b = noop(1);
    let c = noop(0);
    assert!(a.seq_num() < b.seq_num());
    assert!(b.seq_num() < c.seq_num());
  }

  #[test]
  fn ordering_is_priority_then_seq() {
    let first = noop(1);
    let second = noop(1);
    let control = noop(0);
    // Same priority: earlier submission sorts first.
    assert!(first < second);
    // Smaller priority overtakes regardless of submission order.
    assert!(control < first);
  }

  #[test]
  fn display_includes_label_priority_and_seq() {
    let mail: Mail<()> = Mail::new(|_| Ok(()), 0, "checkpoint-7");
    let rendered = mail.to_string();
    assert!(rendered.starts_with("checkpoint-7 (priority=0, seq="));
  }

  #[test]
  fn run_propagates_the_body_error() {
    let mut hits = 0u32;
    let ok: Mail<u32> = Mail::new(
      |count| {
        *count += 1;
        Ok(())
      },
      1,
      "bump",
    );
    assert!(ok.run(&mut hits).is_ok());
    assert_eq!(hits, 1);

    let failing: Mail<u32> = Mail::new(|_| Err("boom".into()), 1, "explode");
    assert_eq!(failing.run(&mut hits).unwrap_err().to_string(), "boom");
  }
}
