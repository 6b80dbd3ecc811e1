//! Tipos de evento de una corrida.
//!
//! El journal es append-only y sobrevive entre corridas de la misma red: es lo
//! que permite reconocer un intent enviado cuyo commit en el checkpoint nunca
//! llegó a escribirse.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreEngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de cada corrida.
    RunStarted {
        network: String,
        definition_hash: String,
        step_count: usize,
        state_version: Option<u64>,
    },
    /// El step ya estaba satisfecho por el checkpoint.
    StepSkipped { step_id: String },
    StepStarted { step_id: String, idempotency_key: String },
    /// Se escribe antes del envío. Un `IntentSubmitted` sin `StepCommitted`
    /// posterior marca un intent que hay que reconciliar.
    IntentSubmitted {
        step_id: String,
        idempotency_key: String,
        intent: String,
        valid_until: i64,
    },
    StepCommitted {
        step_id: String,
        intent: String,
        outputs: Vec<(String, String)>,
    },
    /// Outputs tomados de un intent de una corrida anterior, sin reenviar.
    StepRecovered { step_id: String, intent: String },
    StepFailed { step_id: String, error: CoreEngineError },
    RunFinished { committed: usize, failed: bool },
}

impl RunEventKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            RunEventKind::RunStarted { .. } => "RunStarted",
            RunEventKind::StepSkipped { .. } => "StepSkipped",
            RunEventKind::StepStarted { .. } => "StepStarted",
            RunEventKind::IntentSubmitted { .. } => "IntentSubmitted",
            RunEventKind::StepCommitted { .. } => "StepCommitted",
            RunEventKind::StepRecovered { .. } => "StepRecovered",
            RunEventKind::StepFailed { .. } => "StepFailed",
            RunEventKind::RunFinished { .. } => "RunFinished",
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            RunEventKind::StepSkipped { step_id }
            | RunEventKind::StepStarted { step_id, .. }
            | RunEventKind::IntentSubmitted { step_id, .. }
            | RunEventKind::StepCommitted { step_id, .. }
            | RunEventKind::StepRecovered { step_id, .. }
            | RunEventKind::StepFailed { step_id, .. } => Some(step_id),
            RunEventKind::RunStarted { .. } | RunEventKind::RunFinished { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el store, orden de append
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>,
}
