//! provision-toolchain: compilación de componentes con el toolchain externo y
//! archivo de los artefactos resultantes.
mod command;
mod error;
mod scrypto;

pub use command::CommandLine;
pub use error::BuildError;
pub use scrypto::{ScryptoToolchain, ToolchainConfig, DEFAULT_TARGET_DIR};

use std::path::Path;

use async_trait::async_trait;
use provision_core::BuildEnv;
use sha2::{Digest, Sha256};

/// Bytecode y definición de interfaz de un componente, como bytes opacos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub component: String,
    pub code: Vec<u8>,
    pub definition: Vec<u8>,
}

impl Artifacts {
    pub fn code_sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.code))
    }

    pub fn definition_sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.definition))
    }
}

#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Compila `component` con `env` y archiva los artefactos en `archive_dir`.
    async fn build(&self, component: &str, env: &BuildEnv, archive_dir: &Path) -> Result<Artifacts, BuildError>;
}
