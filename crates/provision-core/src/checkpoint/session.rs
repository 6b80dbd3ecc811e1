//! Guardia de alcance sobre el checkpoint de una corrida.
//!
//! Cada `commit` escribe a disco en el acto. Si la sesión se descarta con
//! cambios sin escribir (error o panic a mitad de camino), `Drop` hace el
//! flush final.

use log::{debug, error};

use super::{Checkpoint, CheckpointStore};
use crate::errors::CoreEngineError;

pub struct CheckpointSession<'s> {
    store: &'s dyn CheckpointStore,
    checkpoint: Checkpoint,
    dirty: bool,
}

impl<'s> CheckpointSession<'s> {
    pub fn open(store: &'s dyn CheckpointStore, network: &str) -> Result<Self, CoreEngineError> {
        let checkpoint = store.load(network)?;
        if checkpoint.network() != network {
            return Err(CoreEngineError::NetworkMismatch { expected: network.to_string(),
                                                          found: checkpoint.network().to_string() });
        }
        debug!("checkpoint:open network={network} keys={}", checkpoint.len());
        Ok(Self { store,
                  checkpoint,
                  dirty: false })
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Registra los outputs de un step y hace flush.
    ///
    /// Todos los conflictos se detectan antes de escribir nada: o entran todos
    /// los outputs del step o ninguno.
    pub fn commit(&mut self, step_id: &str, outputs: &[(String, String)]) -> Result<(), CoreEngineError> {
        let mut staged = self.checkpoint.clone();
        for (key, value) in outputs {
            staged.set(key, value)?;
        }
        self.checkpoint = staged;
        self.dirty = true;
        debug!("checkpoint:commit step={step_id} outputs={}", outputs.len());
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), CoreEngineError> {
        self.store.flush(&self.checkpoint)?;
        self.dirty = false;
        Ok(())
    }

    /// Cierra la sesión devolviendo el estado final.
    pub fn finish(mut self) -> Result<Checkpoint, CoreEngineError> {
        if self.dirty {
            self.flush()?;
        }
        Ok(std::mem::take(&mut self.checkpoint))
    }
}

impl Drop for CheckpointSession<'_> {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.store.flush(&self.checkpoint) {
                error!("checkpoint:drop flush failed network={} err={e}", self.checkpoint.network());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;

    /// Store que falla el primer flush y acepta los siguientes.
    struct FlakyStore {
        inner: InMemoryCheckpointStore,
        failed: std::sync::atomic::AtomicBool,
    }

    impl CheckpointStore for FlakyStore {
        fn load(&self, network: &str) -> Result<Checkpoint, CoreEngineError> {
            self.inner.load(network)
        }

        fn flush(&self, checkpoint: &Checkpoint) -> Result<(), CoreEngineError> {
            if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(CoreEngineError::Storage("disk full".into()));
            }
            self.inner.flush(checkpoint)
        }
    }

    #[test]
    fn commit_flushes_immediately() {
        let store = InMemoryCheckpointStore::new();
        let mut session = CheckpointSession::open(&store, "stokenet").unwrap();
        session.commit("owner", &[("OWNER_RESOURCE".into(), "resource_tdx_2_1a".into())]).unwrap();
        assert_eq!(store.flush_count(), 1);
        assert_eq!(store.stored("stokenet").unwrap().get("OWNER_RESOURCE"), Some("resource_tdx_2_1a"));
    }

    #[test]
    fn conflicting_commit_changes_nothing() {
        let mut cp = Checkpoint::new("stokenet");
        cp.set("A", "1").unwrap();
        let store = InMemoryCheckpointStore::seed(cp);
        let mut session = CheckpointSession::open(&store, "stokenet").unwrap();
        let err = session.commit("s", &[("B".into(), "2".into()), ("A".into(), "9".into())]).unwrap_err();
        assert!(matches!(err, CoreEngineError::CheckpointConflict { .. }));
        assert!(!session.checkpoint().contains("B"));
    }

    #[test]
    fn drop_flushes_what_a_failed_commit_left_behind() {
        let store = FlakyStore { inner: InMemoryCheckpointStore::new(),
                                 failed: std::sync::atomic::AtomicBool::new(false) };
        {
            let mut session = CheckpointSession::open(&store, "stokenet").unwrap();
            assert!(session.commit("owner", &[("OWNER_RESOURCE".into(), "r".into())]).is_err());
        }
        assert_eq!(store.inner.stored("stokenet").unwrap().get("OWNER_RESOURCE"), Some("r"));
    }
}
