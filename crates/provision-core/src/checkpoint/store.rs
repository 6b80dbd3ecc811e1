use std::collections::HashMap;
use std::sync::Mutex;

use super::Checkpoint;
use crate::errors::CoreEngineError;

/// Almacenamiento durable de checkpoints.
///
/// `load` de una red sin checkpoint previo devuelve un mapa vacío, no un
/// error. `flush` escribe el mapa completo; no existe escritura parcial.
pub trait CheckpointStore: Send + Sync {
    fn load(&self, network: &str) -> Result<Checkpoint, CoreEngineError>;
    fn flush(&self, checkpoint: &Checkpoint) -> Result<(), CoreEngineError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    stored: HashMap<String, Checkpoint>,
    flushes: u32,
}

/// Store en memoria, para tests. Cuenta los flush.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    inner: Mutex<InMemoryState>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-carga un checkpoint como si viniera de una corrida anterior.
    pub fn seed(checkpoint: Checkpoint) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.inner.lock() {
            state.stored.insert(checkpoint.network().to_string(), checkpoint);
        }
        store
    }

    pub fn stored(&self, network: &str) -> Option<Checkpoint> {
        self.inner.lock().ok().and_then(|s| s.stored.get(network).cloned())
    }

    pub fn flush_count(&self) -> u32 {
        self.inner.lock().map(|s| s.flushes).unwrap_or_default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, network: &str) -> Result<Checkpoint, CoreEngineError> {
        let state = self.inner.lock().map_err(|_| CoreEngineError::Storage("checkpoint lock poisoned".into()))?;
        Ok(state.stored.get(network).cloned().unwrap_or_else(|| Checkpoint::new(network)))
    }

    fn flush(&self, checkpoint: &Checkpoint) -> Result<(), CoreEngineError> {
        let mut state = self.inner.lock().map_err(|_| CoreEngineError::Storage("checkpoint lock poisoned".into()))?;
        state.stored.insert(checkpoint.network().to_string(), checkpoint.clone());
        state.flushes += 1;
        Ok(())
    }
}
