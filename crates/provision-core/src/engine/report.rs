use indexmap::IndexMap;
use uuid::Uuid;

use crate::checkpoint::Checkpoint;
use crate::errors::CoreEngineError;
use crate::step::StepStatus;

/// Resultado de una corrida del sequencer.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Estado final de cada step, en orden de plan.
    pub statuses: IndexMap<String, StepStatus>,
    /// Transacciones enviadas al ledger en esta corrida.
    pub submissions: usize,
    /// Steps cuyos outputs salieron de un intent de una corrida anterior.
    pub recovered: Vec<String>,
    /// Primer error; detiene la corrida.
    pub failure: Option<CoreEngineError>,
    /// Checkpoint tal como quedó escrito.
    pub checkpoint: Checkpoint,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn status(&self, step_id: &str) -> Option<StepStatus> {
        self.statuses.get(step_id).copied()
    }

    pub fn committed(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == StepStatus::Committed)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn into_result(self) -> Result<Self, CoreEngineError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
