//! Contexto explícito de corrida y de step.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use provision_gateway::{Network, NetworkConfiguration, WellKnownAddresses};
use provision_manifest::Address;
use serde::Serialize;

use crate::checkpoint::Checkpoint;
use crate::constants::NETWORK_ID_ENV;
use crate::errors::CoreEngineError;

/// Datos de la corrida que antes eran estado global: red, sello temporal y
/// directorio de archivo. Se pasa por referencia a cada componente.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub network: Network,
    pub network_id: u8,
    /// `%Y%m%d%H` del inicio de la corrida.
    pub run_stamp: String,
    pub releases_dir: PathBuf,
    pub account: Address,
    pub well_known: WellKnownAddresses,
}

impl RunContext {
    pub fn new(config: &NetworkConfiguration, account: Address, releases_dir: impl Into<PathBuf>, started_at: DateTime<Utc>) -> Self {
        Self { network: config.network,
               network_id: config.network_id,
               run_stamp: started_at.format("%Y%m%d%H").to_string(),
               releases_dir: releases_dir.into(),
               account,
               well_known: config.well_known.clone() }
    }

    pub fn network_name(&self) -> &'static str {
        self.network.name()
    }

    pub fn is_test_network(&self) -> bool {
        self.network.is_test()
    }

    /// `<releases_dir>/<run_stamp>_<network>/`
    pub fn archive_dir(&self) -> PathBuf {
        self.releases_dir.join(format!("{}_{}", self.run_stamp, self.network_name()))
    }

    pub fn releases_dir(&self) -> &Path {
        &self.releases_dir
    }
}

/// Entorno del toolchain: `NETWORK_ID` primero y después los outputs ya
/// conocidos, en orden de inserción.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildEnv(IndexMap<String, String>);

impl BuildEnv {
    pub fn new(network_id: u8) -> Self {
        let mut vars = IndexMap::new();
        vars.insert(NETWORK_ID_ENV.to_string(), network_id.to_string());
        Self(vars)
    }

    /// Claves de `order` presentes en el checkpoint, en ese orden; después el
    /// resto de claves del checkpoint en orden lexicográfico.
    pub fn from_checkpoint(network_id: u8, order: &[String], checkpoint: &Checkpoint) -> Self {
        let mut env = Self::new(network_id);
        for key in order {
            if let Some(value) = checkpoint.get(key) {
                env.insert(key, value);
            }
        }
        for (key, value) in checkpoint.values() {
            if !env.0.contains_key(key) {
                env.insert(key, value);
            }
        }
        env
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lo que ve un step al preparar su manifiesto.
pub struct StepContext<'a> {
    pub step_id: &'a str,
    pub run: &'a RunContext,
    pub checkpoint: &'a Checkpoint,
    pub build_env: BuildEnv,
}

impl<'a> StepContext<'a> {
    pub fn value(&self, key: &str) -> Result<&'a str, CoreEngineError> {
        self.checkpoint.get(key).ok_or_else(|| CoreEngineError::MissingInput { step: self.step_id.to_string(),
                                                                                key: key.to_string() })
    }

    pub fn address(&self, key: &str) -> Result<Address, CoreEngineError> {
        let value = self.value(key)?;
        Address::parse(value).map_err(|_| CoreEngineError::InvalidCheckpointValue { key: key.to_string(),
                                                                                     value: value.to_string() })
    }

    pub fn account(&self) -> &Address {
        &self.run.account
    }
}
