//! Stream-task lifecycle: the operator seam, the data-path default action,
//! the checkpoint scheduler thread, and the task that wires them together.

pub mod checkpoint;
pub mod input_processor;
pub mod stream_task;

pub use checkpoint::CheckpointScheduler;
pub use input_processor::StreamInputProcessor;
pub use stream_task::{StreamOperator, StreamTask};
