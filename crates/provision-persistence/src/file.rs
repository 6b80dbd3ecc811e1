//! Checkpoint en archivo JSON plano, uno por red.
//!
//! Cada flush escribe dos copias idénticas:
//! - canónica: `<deploy_dir>/<network>.config.json`, la que lee la próxima corrida;
//! - archivo: `<archive_dir>/<network>.config.json`, con el sello de la corrida.
//!
//! El archivo es editable a mano; un archivo ausente equivale a un mapa vacío.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use provision_core::{Checkpoint, CheckpointStore, CoreEngineError};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    deploy_dir: PathBuf,
    archive_dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(deploy_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self { deploy_dir: deploy_dir.into(),
               archive_dir: archive_dir.into() }
    }

    pub fn canonical_path(&self, network: &str) -> PathBuf {
        self.deploy_dir.join(file_name(network))
    }

    pub fn archive_path(&self, network: &str) -> PathBuf {
        self.archive_dir.join(file_name(network))
    }

    fn read(&self, network: &str) -> Result<Checkpoint, PersistenceError> {
        let path = self.canonical_path(network);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("checkpoint:load network={network} path={} absent, starting empty", path.display());
                return Ok(Checkpoint::new(network));
            }
            Err(e) => return Err(PersistenceError::io(&path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Checkpoint::new(network));
        }
        let values: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| PersistenceError::corrupt(&path, e.to_string()))?;
        debug!("checkpoint:load network={network} keys={}", values.len());
        Ok(Checkpoint::from_values(network, values))
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let bytes = to_pretty_json(checkpoint.values())?;
        let network = checkpoint.network();

        fs::create_dir_all(&self.deploy_dir).map_err(|e| PersistenceError::io(&self.deploy_dir, e))?;
        let canonical = self.canonical_path(network);
        let tmp = canonical.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|e| PersistenceError::io(&tmp, e))?;
        fs::rename(&tmp, &canonical).map_err(|e| PersistenceError::io(&canonical, e))?;

        fs::create_dir_all(&self.archive_dir).map_err(|e| PersistenceError::io(&self.archive_dir, e))?;
        let archive = self.archive_path(network);
        fs::write(&archive, &bytes).map_err(|e| PersistenceError::io(&archive, e))?;

        debug!("checkpoint:flush network={network} keys={} canonical={} archive={}",
               checkpoint.len(),
               canonical.display(),
               archive.display());
        Ok(())
    }
}

fn file_name(network: &str) -> String {
    format!("{network}.config.json")
}

/// JSON con indentación de 4 espacios.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, PersistenceError> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self, network: &str) -> Result<Checkpoint, CoreEngineError> {
        Ok(self.read(network)?)
    }

    fn flush(&self, checkpoint: &Checkpoint) -> Result<(), CoreEngineError> {
        Ok(self.write(checkpoint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_json_uses_four_spaces() {
        let mut values = BTreeMap::new();
        values.insert("OWNER_RESOURCE".to_string(), "resource_tdx_2_1a".to_string());
        let text = String::from_utf8(to_pretty_json(&values).unwrap()).unwrap();
        assert_eq!(text, "{\n    \"OWNER_RESOURCE\": \"resource_tdx_2_1a\"\n}\n");
    }
}
