// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Once};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use millstream::{
  InputGate, MailResult, MailboxController, MailboxExecutor, ProcessingTimeService, StreamOperator, StreamTask,
  SystemProcessingTimeService, TaskConfig, TaskError, TaskMailbox,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static TRACING_INIT: Once = Once::new();

// Initialize tracing once per test binary; RUST_LOG overrides the default.
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "millstream=trace,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_test_writer()
      .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set global tracing subscriber");
  });
}

/// Everything the task does that a test might assert on, tagged with the
/// thread it happened on.
#[derive(Debug)]
pub enum TaskEvent {
  Record {
    payload: String,
    thread: ThreadId,
  },
  Checkpoint {
    id: u64,
    records_so_far: u64,
    thread: ThreadId,
  },
  Timer {
    fired_at: u64,
    records_so_far: u64,
    thread: ThreadId,
  },
}

/// The record-counting operator the end-to-end scenarios run against.
pub struct CountingOperator {
  events: Sender<TaskEvent>,
  records: u64,
  per_record_delay: Option<Duration>,
}

impl CountingOperator {
  pub fn new(events: Sender<TaskEvent>, per_record_delay: Option<Duration>) -> Self {
    Self {
      events,
      records: 0,
      per_record_delay,
    }
  }

  pub fn records(&self) -> u64 {
    self.records
  }

  /// Called from timer mails; reports the firing plus the record count the
  /// callback observed on the mailbox thread.
  pub fn emit_timer(&mut self, fired_at: u64) {
    let _ = self.events.send(TaskEvent::Timer {
      fired_at,
      records_so_far: self.records,
      thread: thread::current().id(),
    });
  }
}

impl StreamOperator for CountingOperator {
  fn process_record(&mut self, record: String) -> MailResult {
    if let Some(delay) = self.per_record_delay {
      thread::sleep(delay);
    }
    self.records += 1;
    let _ = self.events.send(TaskEvent::Record {
      payload: record,
      thread: thread::current().id(),
    });
    Ok(())
  }

  fn perform_checkpoint(&mut self, checkpoint_id: u64) -> MailResult {
    let _ = self.events.send(TaskEvent::Checkpoint {
      id: checkpoint_id,
      records_so_far: self.records,
      thread: thread::current().id(),
    });
    Ok(())
  }
}

/// A running task plus every handle a producer-side test needs.
pub struct TaskFixture {
  pub gate: Arc<InputGate>,
  pub mailbox: Arc<TaskMailbox<CountingOperator>>,
  pub main_executor: MailboxExecutor<CountingOperator>,
  pub control_executor: MailboxExecutor<CountingOperator>,
  pub timer_service: Arc<SystemProcessingTimeService<CountingOperator>>,
  pub controller: MailboxController<CountingOperator>,
  pub task_thread: ThreadId,
  pub events: Receiver<TaskEvent>,
  join: JoinHandle<Result<(), TaskError>>,
}

impl TaskFixture {
  /// Closes the mailbox and waits for `invoke()` to return.
  pub fn close_and_join(self) -> Result<(), TaskError> {
    self.mailbox.close();
    self.join()
  }

  pub fn join(self) -> Result<(), TaskError> {
    self.join.join().expect("task thread panicked")
  }

  /// Receives the next event, failing the test after `timeout`.
  pub fn expect_event(&self, timeout: Duration) -> TaskEvent {
    self
      .events
      .recv_timeout(timeout)
      .expect("no task event within the timeout")
  }

  /// Receives the next event and asserts it is a record with `payload`,
  /// processed on the mailbox thread.
  pub fn expect_record(&self, payload: &str, timeout: Duration) {
    match self.expect_event(timeout) {
      TaskEvent::Record { payload: seen, thread } => {
        assert_eq!(seen, payload);
        assert_eq!(thread, self.task_thread, "record processed off the mailbox thread");
      }
      other => panic!("expected record {payload:?}, got {other:?}"),
    }
  }

  pub fn assert_no_event_within(&self, window: Duration) {
    if let Ok(event) = self.events.recv_timeout(window) {
      panic!("expected quiescence, got {event:?}");
    }
  }
}

pub fn spawn_task(config: TaskConfig) -> TaskFixture {
  spawn_task_with_delay(config, None)
}

/// Spawns a mailbox thread running a `CountingOperator` task and hands back
/// the producer-side view. `per_record_delay` throttles record processing so
/// preemption windows are observable.
pub fn spawn_task_with_delay(config: TaskConfig, per_record_delay: Option<Duration>) -> TaskFixture {
  setup_tracing();
  let gate = Arc::new(InputGate::new());
  let (event_tx, event_rx) = mpsc::channel();
  let (handle_tx, handle_rx) = mpsc::channel();
  let task_gate = Arc::clone(&gate);

  let join = thread::Builder::new()
    .name("mailbox-thread".into())
    .spawn(move || {
      let operator = CountingOperator::new(event_tx, per_record_delay);
      let mut task = StreamTask::new(operator, task_gate, config).expect("failed to build stream task");
      handle_tx
        .send((
          thread::current().id(),
          task.mailbox(),
          task.main_executor(),
          task.control_executor(),
          task.processing_time_service(),
          task.controller(),
        ))
        .expect("fixture receiver dropped");
      task.invoke()
    })
    .expect("failed to spawn mailbox thread");

  let (task_thread, mailbox, main_executor, control_executor, timer_service, controller) =
    handle_rx.recv().expect("task thread died during construction");

  TaskFixture {
    gate,
    mailbox,
    main_executor,
    control_executor,
    timer_service,
    controller,
    task_thread,
    events: event_rx,
    join,
  }
}

/// Polls until the default action reports suspended (the task thread is
/// parked in a blocking take), failing after `timeout`.
pub fn await_suspension(fixture: &TaskFixture, timeout: Duration) {
  let deadline = std::time::Instant::now() + timeout;
  while fixture.controller.is_default_action_available() {
    assert!(
      std::time::Instant::now() < deadline,
      "task never suspended its default action"
    );
    thread::sleep(Duration::from_millis(2));
  }
}

/// Registers a processing-time timer that keeps re-registering itself every
/// `period_ms` and reports each firing through the operator.
pub fn register_periodic_timer(service: Arc<SystemProcessingTimeService<CountingOperator>>, period_ms: u64) {
  let now = service.current_processing_time();
  let next = Arc::clone(&service);
  // Registration failures after shutdown just end the chain.
  let _ = service.register_timer(
    now + period_ms,
    Box::new(move |op: &mut CountingOperator, fired_at| {
      op.emit_timer(fired_at);
      register_periodic_timer(next, period_ms);
      Ok(())
    }),
  );
}
