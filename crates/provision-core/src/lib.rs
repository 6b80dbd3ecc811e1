//! provision-core: plan de steps, checkpoint, journal de corrida y sequencer.
pub mod checkpoint;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod plan;
pub mod step;

pub use checkpoint::{Checkpoint, CheckpointSession, CheckpointStore, InMemoryCheckpointStore};
pub use engine::{BuildEnv, PollPolicy, RunContext, RunReport, Sequencer, StepContext};
pub use errors::{classify_error, CoreEngineError, ErrorClass};
pub use event::{EventStore, InMemoryEventLog, RunEvent, RunEventKind};
pub use plan::{PlanBuilder, ProvisionPlan};
pub use step::{OutputBinding, StepDefinition, StepStatus};
