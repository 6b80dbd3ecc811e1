//! Definición de steps de aprovisionamiento.

mod definition;
mod status;

pub use definition::{OutputBinding, StepDefinition};
pub use status::StepStatus;
