use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::TaskError;
use crate::mailbox::MailboxExecutor;
use crate::task::stream_task::StreamOperator;

struct TickGate {
  stopped: Mutex<bool>,
  wakeup: Condvar,
}

/// Periodic checkpoint trigger.
///
/// A dedicated thread that, every `interval`, increments the checkpoint id
/// and submits a control-priority mail calling the operator's
/// `perform_checkpoint`. The control priority is what lets the checkpoint
/// overtake queued data work. The scheduler never touches operator state
/// itself, and [`shutdown`](Self::shutdown) interrupts a sleep in progress
/// and joins the thread.
pub struct CheckpointScheduler {
  gate: Arc<TickGate>,
  thread: Option<JoinHandle<()>>,
}

impl CheckpointScheduler {
  /// Spawns the tick thread. Fails with [`TaskError::Internal`] when the
  /// thread cannot be spawned.
  pub fn start<Op>(executor: MailboxExecutor<Op>, interval: Duration) -> Result<Self, TaskError>
  where
    Op: StreamOperator + 'static,
  {
    let gate = Arc::new(TickGate {
      stopped: Mutex::new(false),
      wakeup: Condvar::new(),
    });
    let thread_gate = Arc::clone(&gate);
    let thread = thread::Builder::new()
      .name("checkpoint-scheduler".into())
      .spawn(move || tick_loop(thread_gate, executor, interval))
      .map_err(|error| TaskError::Internal(format!("failed to spawn checkpoint scheduler: {error}")))?;
    tracing::debug!(?interval, "checkpoint scheduler started");
    Ok(Self {
      gate,
      thread: Some(thread),
    })
  }

  /// Interrupts the current sleep, stops the tick loop and joins the thread.
  pub fn shutdown(mut self) {
    {
      let mut stopped = self.gate.stopped.lock();
      *stopped = true;
      self.gate.wakeup.notify_all();
    }
    if let Some(thread) = self.thread.take() {
      if let Err(panic) = thread.join() {
        tracing::error!(?panic, "checkpoint scheduler panicked");
      }
    }
    tracing::debug!("checkpoint scheduler shut down");
  }
}

fn tick_loop<Op>(gate: Arc<TickGate>, executor: MailboxExecutor<Op>, interval: Duration)
where
  Op: StreamOperator + 'static,
{
  let mut checkpoint_id: u64 = 0;
  loop {
    let deadline = Instant::now() + interval;
    let mut stopped = gate.stopped.lock();
    while !*stopped {
      if gate.wakeup.wait_until(&mut stopped, deadline).timed_out() {
        break;
      }
    }
    if *stopped {
      return;
    }
    drop(stopped);

    checkpoint_id += 1;
    let id = checkpoint_id;
    tracing::info!(checkpoint_id = id, "triggering checkpoint");
    executor.execute(move |op: &mut Op| op.perform_checkpoint(id), format!("checkpoint-{id}"));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::MailResult;
  use crate::mailbox::{TaskMailbox, MIN_PRIORITY};
  use std::time::Instant;

  #[derive(Default)]
  struct CheckpointLog {
    ids: Vec<u64>,
  }

  impl StreamOperator for CheckpointLog {
    fn process_record(&mut self, _record: String) -> MailResult {
      Ok(())
    }

    fn perform_checkpoint(&mut self, checkpoint_id: u64) -> MailResult {
      self.ids.push(checkpoint_id);
      Ok(())
    }
  }

  #[test]
  fn ticks_submit_control_mails_with_increasing_ids() {
    let mailbox: Arc<TaskMailbox<CheckpointLog>> = Arc::new(TaskMailbox::new(thread::current(), true));
    let executor = MailboxExecutor::new(Arc::clone(&mailbox), MIN_PRIORITY);
    let scheduler = CheckpointScheduler::start(executor, Duration::from_millis(40)).expect("scheduler starts");

    let mut op = CheckpointLog::default();
    let deadline = Instant::now() + Duration::from_secs(2);
    while op.ids.len() < 3 && Instant::now() < deadline {
      if let Some(mail) = mailbox.try_take(MIN_PRIORITY) {
        assert!(mail.label().starts_with("checkpoint-"));
        mail.run(&mut op).unwrap();
      } else {
        thread::sleep(Duration::from_millis(5));
      }
    }
    scheduler.shutdown();
    assert!(op.ids.len() >= 3, "expected at least 3 ticks, got {:?}", op.ids);
    assert_eq!(&op.ids[..3], &[1, 2, 3]);
  }

  #[test]
  fn shutdown_interrupts_a_sleep_in_progress() {
    let mailbox: Arc<TaskMailbox<CheckpointLog>> = Arc::new(TaskMailbox::new(thread::current(), true));
    let executor = MailboxExecutor::new(Arc::clone(&mailbox), MIN_PRIORITY);
    let scheduler = CheckpointScheduler::start(executor, Duration::from_secs(3600)).expect("scheduler starts");
    let started = Instant::now();
    scheduler.shutdown();
    assert!(started.elapsed() < Duration::from_millis(500), "shutdown had to wait for the interval");
    assert!(!mailbox.has_mail());
  }
}
