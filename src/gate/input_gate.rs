use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::NetworkBuffer;
use crate::gate::availability::AvailabilitySignal;

struct GateInner {
  queue: VecDeque<NetworkBuffer>,
  availability: Arc<AvailabilitySignal>,
}

/// The handoff point between producer threads and the task thread.
///
/// A FIFO of opaque buffers plus the current availability signal. The
/// invariant that makes suspension race-free: whenever at least one buffer is
/// queued, the current signal is complete. The signal is replaced with a
/// fresh pending one only by `poll_next`, atomically with the drain that
/// emptied the queue.
pub struct InputGate {
  inner: Mutex<GateInner>,
}

impl InputGate {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(GateInner {
        queue: VecDeque::new(),
        availability: Arc::new(AvailabilitySignal::new()),
      }),
    }
  }

  /// Accepts a buffer from a producer thread. Completing the pending signal
  /// happens under the gate lock, so the "buffer queued implies signal
  /// complete" invariant is never observably violated. Continuations run on
  /// this (producer) thread; the only sanctioned continuation is
  /// `resume_default_action`, which just puts a mail.
  ///
  /// Lock order is gate, then signal state, then mailbox; nothing acquires
  /// these in the reverse direction.
  pub fn on_buffer(&self, buffer: NetworkBuffer) {
    let mut inner = self.inner.lock();
    tracing::trace!(buffer = ?buffer, "buffer enqueued");
    inner.queue.push_back(buffer);
    if !inner.availability.is_complete() {
      inner.availability.complete();
    }
  }

  /// Pops one buffer on the task thread. When the pop drains the queue and
  /// the current signal is complete, the signal is replaced with a fresh
  /// pending one in the same critical section.
  pub fn poll_next(&self) -> Option<NetworkBuffer> {
    let mut inner = self.inner.lock();
    let buffer = inner.queue.pop_front();
    if inner.queue.is_empty() && inner.availability.is_complete() {
      inner.availability = Arc::new(AvailabilitySignal::new());
    }
    buffer
  }

  /// Returns the current availability signal (pending or complete). The
  /// handle is safe to subscribe to after the gate lock is released.
  pub fn availability(&self) -> Arc<AvailabilitySignal> {
    Arc::clone(&self.inner.lock().availability)
  }

  /// Number of queued buffers; advisory snapshot.
  pub fn len(&self) -> usize {
    self.inner.lock().queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for InputGate {
  fn default() -> Self {
    Self::new()
  }
}
