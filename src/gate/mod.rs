//! Producer-to-task handoff: a buffer queue plus a re-armable one-shot
//! availability signal that lets the task suspend without losing wakeups.

pub mod availability;
pub mod input_gate;

pub use availability::AvailabilitySignal;
pub use input_gate::InputGate;
