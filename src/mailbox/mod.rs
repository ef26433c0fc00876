//! The priority mailbox and the single-threaded loop that drains it.

pub mod executor;
pub mod mail;
pub mod processor;
pub mod task_mailbox;

pub use executor::MailboxExecutor;
pub use mail::{Mail, MailAction};
pub use processor::{MailboxController, MailboxDefaultAction, MailboxProcessor, DEFAULT_PRIORITY, MIN_PRIORITY};
pub use task_mailbox::{MailboxState, TaskMailbox};
