use serde::{Deserialize, Serialize};

/// Estado de un step dentro de una corrida.
///
/// El estado inicial sale del checkpoint (`Satisfied` si todas sus claves de
/// output existen, si no `Pending`). Transiciones válidas:
/// - `Pending` -> `Executing`
/// - `Executing` -> `Committed`
/// - `Executing` -> `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Satisfied,
    Executing,
    Committed,
    Failed,
}

impl StepStatus {
    /// Sus outputs están en el checkpoint.
    pub fn is_done(&self) -> bool {
        matches!(self, StepStatus::Satisfied | StepStatus::Committed)
    }
}
