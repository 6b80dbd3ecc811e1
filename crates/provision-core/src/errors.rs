//! Errores del core y su clasificación.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("dependency cycle between steps: {0:?}")]
    DependencyCycle(Vec<String>),
    #[error("step {step} requires {key}, which is neither produced by the plan nor present in the checkpoint")]
    MissingInput { step: String, key: String },
    #[error("step {step} has {present:?} in the checkpoint but not {missing:?}; repair the checkpoint before running again")]
    PartialOutputs { step: String, present: Vec<String>, missing: Vec<String> },
    #[error("checkpoint key {key} already holds {existing}, refusing to overwrite with {attempted}")]
    CheckpointConflict { key: String, existing: String, attempted: String },
    #[error("checkpoint value {value} for {key} is not a ledger address")]
    InvalidCheckpointValue { key: String, value: String },
    #[error("checkpoint belongs to network {found}, run targets {expected}")]
    NetworkMismatch { expected: String, found: String },
    #[error("step {step} declares {expected} outputs but the ledger reported {found} new addresses")]
    OutputMismatch { step: String, expected: usize, found: usize },
    #[error("transaction {intent} of step {step} failed: {reason}")]
    TransactionFailed { step: String, intent: String, reason: String },
    #[error("transaction {intent} of step {step} did not reach a terminal status in time")]
    StatusTimeout { step: String, intent: String },
    #[error("gateway error in step {step}: {message}")]
    Gateway { step: String, message: String },
    #[error("build failed: {0}")]
    Build(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Clase de error, usada por los puntos de entrada para decidir el código de salida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Configuración o plan inválido: abortar sin reintentos.
    Configuration,
    Build,
    /// Fallo terminal de una transacción o del gateway.
    Transaction,
    Storage,
    Internal,
}

pub fn classify_error(err: &CoreEngineError) -> ErrorClass {
    match err {
        CoreEngineError::InvalidPlan(_)
        | CoreEngineError::DependencyCycle(_)
        | CoreEngineError::MissingInput { .. }
        | CoreEngineError::PartialOutputs { .. }
        | CoreEngineError::CheckpointConflict { .. }
        | CoreEngineError::InvalidCheckpointValue { .. }
        | CoreEngineError::NetworkMismatch { .. } => ErrorClass::Configuration,
        CoreEngineError::Build(_) => ErrorClass::Build,
        CoreEngineError::OutputMismatch { .. }
        | CoreEngineError::TransactionFailed { .. }
        | CoreEngineError::StatusTimeout { .. }
        | CoreEngineError::Gateway { .. } => ErrorClass::Transaction,
        CoreEngineError::Storage(_) => ErrorClass::Storage,
        CoreEngineError::Internal(_) => ErrorClass::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_a_configuration_error() {
        let err = CoreEngineError::MissingInput { step: "oracle".into(),
                                                  key: "ORACLE_PACKAGE".into() };
        assert_eq!(classify_error(&err), ErrorClass::Configuration);
        assert_eq!(classify_error(&CoreEngineError::Build("scrypto".into())), ErrorClass::Build);
        let partial = CoreEngineError::PartialOutputs { step: "faucet".into(),
                                                        present: vec!["FAUCET_COMPONENT".into()],
                                                        missing: vec!["FAUCET_RESOURCE".into()] };
        assert_eq!(classify_error(&partial), ErrorClass::Configuration);
    }

    #[test]
    fn errors_serialize_for_the_journal() {
        let err = CoreEngineError::TransactionFailed { step: "owner".into(),
                                                       intent: "ab".into(),
                                                       reason: "rejected".into() };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(serde_json::from_str::<CoreEngineError>(&json).unwrap(), err);
    }
}
