//! Toolchain externo: limpia la caché, compila con el entorno acumulado y
//! lee los dos artefactos del directorio de salida.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, info};
use provision_core::BuildEnv;
use tokio::process::Command;

use crate::command::CommandLine;
use crate::error::BuildError;
use crate::{ArtifactBuilder, Artifacts};

/// Salida del compilador, relativa al directorio del componente.
pub const DEFAULT_TARGET_DIR: &str = "target/wasm32-unknown-unknown/release";

#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Directorio que contiene un subdirectorio por componente.
    pub components_root: PathBuf,
    pub build: CommandLine,
    /// `None` desactiva la limpieza previa.
    pub clean: Option<CommandLine>,
    pub target_dir: PathBuf,
}

impl ToolchainConfig {
    pub fn new(components_root: impl Into<PathBuf>) -> Self {
        Self { components_root: components_root.into(),
               build: CommandLine::new("scrypto", &["build"]),
               clean: Some(CommandLine::new("cargo", &["clean"])),
               target_dir: PathBuf::from(DEFAULT_TARGET_DIR) }
    }

    pub fn with_build(mut self, build: CommandLine) -> Self {
        self.build = build;
        self
    }

    pub fn with_clean(mut self, clean: Option<CommandLine>) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = target_dir.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScryptoToolchain {
    config: ToolchainConfig,
}

impl ScryptoToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    pub fn component_dir(&self, component: &str) -> PathBuf {
        self.config.components_root.join(component)
    }

    fn artifact_path(&self, component: &str, extension: &str) -> PathBuf {
        self.component_dir(component)
            .join(&self.config.target_dir)
            .join(format!("{component}.{extension}"))
    }

    async fn run(&self, component: &str, cmd: &CommandLine, env: Option<&BuildEnv>) -> Result<(), BuildError> {
        let dir = self.component_dir(component);
        let mut process = Command::new(&cmd.program);
        process.args(&cmd.args)
               .current_dir(&dir)
               .stdin(Stdio::null())
               .stdout(Stdio::inherit())
               .stderr(Stdio::piped());
        if let Some(env) = env {
            for (key, value) in env.iter() {
                process.env(key, value);
            }
        }
        debug!("toolchain:run component={component} cmd=\"{cmd}\" dir={} env_keys={}",
               dir.display(),
               env.map(BuildEnv::len).unwrap_or(0));
        let output = process.output()
                            .await
                            .map_err(|e| BuildError::Spawn { command: cmd.to_string(),
                                                             message: e.to_string() })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::CommandFailed { component: component.to_string(),
                                                   command: cmd.to_string(),
                                                   status: output.status.to_string(),
                                                   stderr: tail(&stderr, 20) });
        }
        Ok(())
    }

    async fn read_artifact(&self, component: &str, extension: &str) -> Result<Vec<u8>, BuildError> {
        let path = self.artifact_path(component, extension);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BuildError::MissingArtifact { component: component.to_string(),
                                                  path: path.display().to_string() })
            }
            Err(e) => Err(BuildError::io(&path, e)),
        }
    }
}

/// Copia ambos artefactos y un `<component>.sha256` con los digests.
async fn archive(artifacts: &Artifacts, archive_dir: &Path) -> Result<(), BuildError> {
    tokio::fs::create_dir_all(archive_dir).await
                                          .map_err(|e| BuildError::io(archive_dir, e))?;
    let component = &artifacts.component;
    let files = [(format!("{component}.wasm"), artifacts.code.clone()),
                 (format!("{component}.rpd"), artifacts.definition.clone()),
                 (format!("{component}.sha256"),
                  format!("{}  {component}.wasm\n{}  {component}.rpd\n",
                          artifacts.code_sha256(),
                          artifacts.definition_sha256()).into_bytes())];
    for (name, bytes) in files {
        let path = archive_dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| BuildError::io(&path, e))?;
    }
    Ok(())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[async_trait]
impl ArtifactBuilder for ScryptoToolchain {
    async fn build(&self, component: &str, env: &BuildEnv, archive_dir: &Path) -> Result<Artifacts, BuildError> {
        if let Some(clean) = &self.config.clean {
            info!("toolchain:clean component={component}");
            self.run(component, clean, None).await?;
        }
        info!("toolchain:build component={component}");
        self.run(component, &self.config.build, Some(env)).await?;

        let artifacts = Artifacts { component: component.to_string(),
                                    code: self.read_artifact(component, "wasm").await?,
                                    definition: self.read_artifact(component, "rpd").await? };
        archive(&artifacts, archive_dir).await?;
        info!("toolchain:archived component={component} code_bytes={} definition_bytes={} dir={}",
              artifacts.code.len(),
              artifacts.definition.len(),
              archive_dir.display());
        Ok(artifacts)
    }
}
