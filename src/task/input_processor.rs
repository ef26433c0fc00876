use std::sync::Arc;

use crate::error::TaskError;
use crate::gate::InputGate;
use crate::mailbox::{MailboxController, MailboxDefaultAction};
use crate::task::stream_task::StreamOperator;

/// The data path: the task's default action.
///
/// Each invocation makes at most one unit of progress: pop one buffer,
/// decode it, hand the record to the operator, return. When the gate is
/// empty it suspends the default action and arranges a resume through the
/// gate's availability signal instead of blocking or spinning.
pub struct StreamInputProcessor {
  gate: Arc<InputGate>,
}

impl StreamInputProcessor {
  pub fn new(gate: Arc<InputGate>) -> Self {
    Self { gate }
  }
}

impl<Op: StreamOperator + 'static> MailboxDefaultAction<Op> for StreamInputProcessor {
  fn run_default_action(&mut self, op: &mut Op, controller: &MailboxController<Op>) -> Result<(), TaskError> {
    if let Some(buffer) = self.gate.poll_next() {
      let record = buffer.to_utf8_lossy();
      return op.process_record(record).map_err(TaskError::RecordProcessing);
    }

    // Empty gate. The order below is load-bearing: the signal is checked
    // *before* suspending, so a buffer that slipped in between our poll and
    // this check simply makes us return and poll again next iteration.
    // Suspending first would lose that wakeup.
    let availability = self.gate.availability();
    if availability.is_complete() {
      return Ok(());
    }
    controller.suspend_default_action();
    let resume = controller.clone();
    // Runs on whichever thread completes the signal (typically the
    // producer); it only puts a mail, never touches task state.
    availability.on_complete(move || resume.resume_default_action());
    Ok(())
  }
}
