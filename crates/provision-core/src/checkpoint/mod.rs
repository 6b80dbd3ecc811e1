//! Checkpoint por red: registro de identificadores ya creados en el ledger.

mod session;
mod store;

pub use session::CheckpointSession;
pub use store::{CheckpointStore, InMemoryCheckpointStore};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::CoreEngineError;

/// Mapa plano `nombre de output -> identificador`. Una clave presente es
/// verdad inmutable: nunca se recalcula ni se sobreescribe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    network: String,
    values: BTreeMap<String, String>,
}

impl Checkpoint {
    pub fn new(network: &str) -> Self {
        Self { network: network.to_string(),
               values: BTreeMap::new() }
    }

    pub fn from_values(network: &str, values: BTreeMap<String, String>) -> Self {
        Self { network: network.to_string(),
               values }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Devuelve `true` si la clave era nueva. Repetir el mismo valor es un no-op;
    /// un valor distinto es conflicto.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, CoreEngineError> {
        match self.values.get(key) {
            Some(existing) if existing == value => Ok(false),
            Some(existing) => Err(CoreEngineError::CheckpointConflict { key: key.to_string(),
                                                                         existing: existing.clone(),
                                                                         attempted: value.to_string() }),
            None => {
                self.values.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_keys_are_immutable() {
        let mut cp = Checkpoint::new("stokenet");
        assert!(cp.set("OWNER_RESOURCE", "resource_tdx_2_1a").unwrap());
        assert!(!cp.set("OWNER_RESOURCE", "resource_tdx_2_1a").unwrap());
        let err = cp.set("OWNER_RESOURCE", "resource_tdx_2_1b").unwrap_err();
        assert!(matches!(err, CoreEngineError::CheckpointConflict { .. }));
        assert_eq!(cp.get("OWNER_RESOURCE"), Some("resource_tdx_2_1a"));
    }
}
