use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};

use crate::error::TaskError;
use crate::mailbox::MailboxExecutor;
use crate::time::{ProcessingTimeService, TimerCallback, TimerHandle};

struct TimerEntry<Op> {
  timestamp: u64,
  // Registration order breaks ties between equal deadlines.
  id: u64,
  callback: TimerCallback<Op>,
  handle: TimerHandle,
}

impl<Op> PartialEq for TimerEntry<Op> {
  fn eq(&self, other: &Self) -> bool {
    self.timestamp == other.timestamp && self.id == other.id
  }
}

impl<Op> Eq for TimerEntry<Op> {}

impl<Op> PartialOrd for TimerEntry<Op> {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
    Some(self.cmp(other))
  }
}

impl<Op> Ord for TimerEntry<Op> {
  fn cmp(&self, other: &Self) -> CmpOrdering {
    self.timestamp.cmp(&other.timestamp).then_with(|| self.id.cmp(&other.id))
  }
}

struct TimerInner<Op> {
  timers: BinaryHeap<Reverse<TimerEntry<Op>>>,
  shutdown: bool,
  next_id: u64,
}

struct TimerShared<Op> {
  inner: Mutex<TimerInner<Op>>,
  wakeup: Condvar,
  executor: MailboxExecutor<Op>,
}

/// Timer service backed by one dedicated worker thread.
///
/// The worker parks on a condvar until the earliest deadline (or a new
/// registration that moves the deadline forward), then mails the due
/// callback to the task at DEFAULT priority. The callback itself never runs
/// on the worker thread.
pub struct SystemProcessingTimeService<Op> {
  shared: Arc<TimerShared<Op>>,
  worker: Mutex<Option<JoinHandle<()>>>,
  daemon: bool,
}

impl<Op: 'static> SystemProcessingTimeService<Op> {
  /// Spawns the worker thread. `executor` must be the owning task's main
  /// (DEFAULT-priority) executor. With `daemon = true`, `shutdown()` wakes
  /// the worker but does not wait for it; with `false` it joins. Fails with
  /// [`TaskError::Internal`] when the worker thread cannot be spawned.
  pub fn start(executor: MailboxExecutor<Op>, daemon: bool) -> Result<Self, TaskError> {
    let shared = Arc::new(TimerShared {
      inner: Mutex::new(TimerInner {
        timers: BinaryHeap::new(),
        shutdown: false,
        next_id: 0,
      }),
      wakeup: Condvar::new(),
      executor,
    });
    let worker_shared = Arc::clone(&shared);
    let worker = thread::Builder::new()
      .name("processing-time-service".into())
      .spawn(move || worker_loop(worker_shared))
      .map_err(|error| TaskError::Internal(format!("failed to spawn processing-time worker: {error}")))?;
    tracing::debug!(daemon, "processing-time service started");
    Ok(Self {
      shared,
      worker: Mutex::new(Some(worker)),
      daemon,
    })
  }
}

impl<Op> ProcessingTimeService<Op> for SystemProcessingTimeService<Op> {
  fn current_processing_time(&self) -> u64 {
    unix_millis()
  }

  fn register_timer(&self, timestamp: u64, callback: TimerCallback<Op>) -> Result<TimerHandle, TaskError> {
    let mut inner = self.shared.inner.lock();
    if inner.shutdown {
      return Err(TaskError::TimerServiceShutdown);
    }
    let handle = TimerHandle::new();
    let id = inner.next_id;
    inner.next_id += 1;
    inner.timers.push(Reverse(TimerEntry {
      timestamp,
      id,
      callback,
      handle: handle.clone(),
    }));
    tracing::trace!(timestamp, id, "timer registered");
    // The new timer may now be the earliest deadline.
    self.shared.wakeup.notify_one();
    Ok(handle)
  }

  fn shutdown(&self) {
    {
      let mut inner = self.shared.inner.lock();
      if inner.shutdown {
        return;
      }
      inner.shutdown = true;
      inner.timers.clear();
      self.shared.wakeup.notify_all();
    }
    let worker = self.worker.lock().take();
    if let Some(worker) = worker {
      if self.daemon {
        // Detached: the worker wakes up, observes shutdown and exits on its
        // own.
        drop(worker);
      } else if let Err(panic) = worker.join() {
        tracing::error!(?panic, "processing-time worker panicked");
      }
    }
    tracing::debug!("processing-time service shut down");
  }
}

enum WorkerStep {
  Idle,
  SleepUntil(u64),
  FireHead,
}

fn worker_loop<Op: 'static>(shared: Arc<TimerShared<Op>>) {
  let mut inner = shared.inner.lock();
  loop {
    if inner.shutdown {
      break;
    }
    let now = unix_millis();
    let step = match inner.timers.peek() {
      None => WorkerStep::Idle,
      Some(Reverse(head)) if head.timestamp > now => WorkerStep::SleepUntil(head.timestamp),
      Some(_) => WorkerStep::FireHead,
    };
    match step {
      WorkerStep::Idle => {
        shared.wakeup.wait(&mut inner);
      }
      WorkerStep::SleepUntil(deadline) => {
        // Re-checks the heap after every wake; an earlier registration or a
        // shutdown cuts the wait short.
        let _ = shared.wakeup.wait_for(&mut inner, Duration::from_millis(deadline - now));
      }
      WorkerStep::FireHead => {
        if let Some(Reverse(entry)) = inner.timers.pop() {
          drop(inner);
          fire(&shared, entry, now);
          inner = shared.inner.lock();
        }
      }
    }
  }
  tracing::trace!("processing-time worker exiting");
}

fn fire<Op: 'static>(shared: &TimerShared<Op>, entry: TimerEntry<Op>, now: u64) {
  if entry.handle.is_cancelled() {
    tracing::trace!(timestamp = entry.timestamp, id = entry.id, "timer cancelled, skipping");
    return;
  }
  tracing::trace!(timestamp = entry.timestamp, id = entry.id, "timer fired, mailing callback");
  let callback = entry.callback;
  // Hop back onto the task thread; the callback observes task state there.
  shared
    .executor
    .execute(move |op| callback(op, now), format!("timer@{}", entry.timestamp));
}

fn unix_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_millis() as u64)
    .unwrap_or(0)
}
