use std::path::Path;

use provision_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{command} for {component} exited with {status}: {stderr}")]
    CommandFailed { component: String, command: String, status: String, stderr: String },
    #[error("{component} built without producing {path}")]
    MissingArtifact { component: String, path: String },
    #[error("could not spawn {command}: {message}")]
    Spawn { command: String, message: String },
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("empty command line for {0}")]
    EmptyCommand(&'static str),
}

impl BuildError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(),
                   message: err.to_string() }
    }
}

impl From<BuildError> for CoreEngineError {
    fn from(err: BuildError) -> Self {
        CoreEngineError::Build(err.to_string())
    }
}
