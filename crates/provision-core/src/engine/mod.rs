//! Motor de ejecución del plan.

mod context;
pub mod sequencer;
mod poll;
mod report;

pub use context::{BuildEnv, RunContext, StepContext};
pub use sequencer::Sequencer;
pub use poll::PollPolicy;
pub use report::RunReport;
