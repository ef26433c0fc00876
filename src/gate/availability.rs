use parking_lot::Mutex;

type Continuation = Box<dyn FnOnce() + Send>;

enum SignalState {
  Pending(Vec<Continuation>),
  Complete,
}

/// A one-shot completion token.
///
/// Starts pending; `complete()` flips it exactly once and runs every
/// registered continuation inline on the completing thread. Continuations
/// registered after completion run immediately on the registering thread.
/// The input gate replaces a completed signal with a fresh one when its
/// queue drains, which is what makes the one-shot reusable across
/// suspend/resume cycles.
pub struct AvailabilitySignal {
  state: Mutex<SignalState>,
}

impl AvailabilitySignal {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(SignalState::Pending(Vec::new())),
    }
  }

  pub fn is_complete(&self) -> bool {
    matches!(*self.state.lock(), SignalState::Complete)
  }

  /// Completes the signal and fires all pending continuations on the calling
  /// thread. Completing an already-complete signal is a no-op.
  pub fn complete(&self) {
    let continuations = {
      let mut state = self.state.lock();
      match std::mem::replace(&mut *state, SignalState::Complete) {
        SignalState::Pending(continuations) => continuations,
        SignalState::Complete => Vec::new(),
      }
    };
    // Run outside the state lock so continuations may re-inspect the signal.
    for continuation in continuations {
      continuation();
    }
  }

  /// Registers a continuation to fire on completion. Safe from any thread.
  /// When the signal is already complete the continuation runs inline,
  /// immediately.
  pub fn on_complete<F>(&self, continuation: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let run_now = {
      let mut state = self.state.lock();
      match &mut *state {
        SignalState::Pending(continuations) => {
          continuations.push(Box::new(continuation));
          None
        }
        SignalState::Complete => Some(continuation),
      }
    };
    if let Some(continuation) = run_now {
      continuation();
    }
  }
}

impl Default for AvailabilitySignal {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[test]
  fn continuation_fires_once_on_complete() {
    let signal = AvailabilitySignal::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    signal.on_complete(move || {
      fired2.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!signal.is_complete());
    signal.complete();
    assert!(signal.is_complete());
    // Second complete is a no-op; the continuation list was already drained.
    signal.complete();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn late_subscription_runs_inline() {
    let signal = AvailabilitySignal::new();
    signal.complete();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = Arc::clone(&fired);
    signal.on_complete(move || {
      fired2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(fired.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn completion_from_another_thread_reaches_the_subscriber() {
    let signal = Arc::new(AvailabilitySignal::new());
    let (tx, rx) = std::sync::mpsc::channel();
    signal.on_complete(move || tx.send(()).unwrap());
    let remote = Arc::clone(&signal);
    std::thread::spawn(move || remote.complete()).join().unwrap();
    rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
  }
}
