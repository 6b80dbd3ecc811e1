//! Errores de persistencia.
//! Mapea fallos de IO y de (de)serialización a variantes semánticas.

use std::path::Path;

use provision_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("corrupt file {path}: {message}")]
    Corrupt { path: String, message: String },
    #[error("serialization error: {0}")]
    Serialize(String),
}

impl PersistenceError {
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(),
                   message: err.to_string() }
    }

    pub fn corrupt(path: &Path, message: impl Into<String>) -> Self {
        Self::Corrupt { path: path.display().to_string(),
                        message: message.into() }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

impl From<PersistenceError> for CoreEngineError {
    fn from(err: PersistenceError) -> Self {
        CoreEngineError::Storage(err.to_string())
    }
}
