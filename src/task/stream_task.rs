use std::sync::Arc;
use std::thread;

use crate::config::TaskConfig;
use crate::error::{MailResult, TaskError};
use crate::gate::InputGate;
use crate::mailbox::{MailboxController, MailboxExecutor, MailboxProcessor, TaskMailbox, MIN_PRIORITY};
use crate::task::checkpoint::CheckpointScheduler;
use crate::task::input_processor::StreamInputProcessor;
use crate::time::{ProcessingTimeService, SystemProcessingTimeService};

/// User-level operator logic. Both callbacks run on the mailbox thread by
/// construction: `process_record` via the default action,
/// `perform_checkpoint` via a control mail. A returned error terminates the
/// task.
pub trait StreamOperator {
  fn process_record(&mut self, record: String) -> MailResult;

  fn perform_checkpoint(&mut self, checkpoint_id: u64) -> MailResult;
}

/// A long-running stream task: one mailbox thread owning all mutable state,
/// fed by an input gate and steered by control mails.
///
/// Construction captures the current thread as the mailbox thread, so a task
/// must be built on the thread that will call [`invoke`](Self::invoke).
/// Executor handles, the controller, and the processing-time service may be
/// obtained before `invoke` and handed to other threads.
pub struct StreamTask<Op: StreamOperator> {
  mailbox: Arc<TaskMailbox<Op>>,
  processor: MailboxProcessor<Op>,
  input: StreamInputProcessor,
  timer_service: Arc<SystemProcessingTimeService<Op>>,
  op: Op,
  config: TaskConfig,
}

impl<Op: StreamOperator + 'static> StreamTask<Op> {
  /// Fails with [`TaskError::Internal`] when the timer worker thread cannot
  /// be spawned.
  pub fn new(op: Op, gate: Arc<InputGate>, config: TaskConfig) -> Result<Self, TaskError> {
    let mailbox = Arc::new(TaskMailbox::new(thread::current(), config.log_dropped_mail));
    let processor = MailboxProcessor::new(Arc::clone(&mailbox));
    let input = StreamInputProcessor::new(gate);
    let timer_service = Arc::new(SystemProcessingTimeService::start(
      processor.main_executor(),
      config.timer_thread_daemon,
    )?);
    Ok(Self {
      mailbox,
      processor,
      input,
      timer_service,
      op,
      config,
    })
  }

  /// DEFAULT-priority executor: for timers and anything else hopping back
  /// onto the task thread.
  pub fn main_executor(&self) -> MailboxExecutor<Op> {
    self.processor.main_executor()
  }

  /// MIN-priority executor: for checkpoints and anything that must preempt
  /// queued data work.
  pub fn control_executor(&self) -> MailboxExecutor<Op> {
    MailboxExecutor::new(Arc::clone(&self.mailbox), MIN_PRIORITY)
  }

  pub fn processing_time_service(&self) -> Arc<SystemProcessingTimeService<Op>> {
    Arc::clone(&self.timer_service)
  }

  pub fn mailbox(&self) -> Arc<TaskMailbox<Op>> {
    Arc::clone(&self.mailbox)
  }

  pub fn controller(&self) -> MailboxController<Op> {
    self.processor.controller()
  }

  /// Runs the task to completion on the mailbox thread.
  ///
  /// Starts the checkpoint scheduler when configured, runs the mailbox loop,
  /// and regardless of how the loop exits releases resources in order:
  /// checkpoint scheduler (joined), timer service, mailbox. Returns the
  /// loop's terminal condition; a closed mailbox is a normal exit.
  pub fn invoke(&mut self) -> Result<(), TaskError> {
    tracing::info!("stream task started");
    let result = self.run_with_scheduler();
    if let Err(error) = &result {
      tracing::error!(error = %error, "task terminated with error");
    }

    self.timer_service.shutdown();
    self.mailbox.close();
    tracing::info!("stream task stopped");
    result
  }

  /// Starts the checkpoint scheduler when configured, runs the loop, and
  /// joins the scheduler before the caller closes the mailbox.
  fn run_with_scheduler(&mut self) -> Result<(), TaskError> {
    let scheduler = self
      .config
      .checkpoint_interval
      .map(|interval| CheckpointScheduler::start(self.control_executor(), interval))
      .transpose()?;

    let result = self.processor.run_mailbox_loop(&mut self.op, &mut self.input);
    if let Some(scheduler) = scheduler {
      scheduler.shutdown();
    }
    result
  }

  /// The operator state; only meaningful to call before `invoke` or after it
  /// returned, both of which happen on the mailbox thread.
  pub fn operator(&self) -> &Op {
    &self.op
  }
}
