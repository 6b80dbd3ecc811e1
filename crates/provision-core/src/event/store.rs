use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};
use crate::errors::CoreEngineError;

/// Almacenamiento de eventos append-only, uno por red.
pub trait EventStore: Send + Sync {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, run_id: Uuid, kind: RunEventKind) -> Result<RunEvent, CoreEngineError>;
    /// Todos los eventos, de todas las corridas, en orden ascendente de seq.
    fn list(&self) -> Result<Vec<RunEvent>, CoreEngineError>;

    fn list_run(&self, run_id: Uuid) -> Result<Vec<RunEvent>, CoreEngineError> {
        Ok(self.list()?.into_iter().filter(|e| e.run_id == run_id).collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    inner: Mutex<Vec<RunEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventLog {
    fn append_kind(&self, run_id: Uuid, kind: RunEventKind) -> Result<RunEvent, CoreEngineError> {
        let mut events = self.inner.lock().map_err(|_| CoreEngineError::Storage("event log lock poisoned".into()))?;
        let ev = RunEvent { seq: events.len() as u64,
                            run_id,
                            kind,
                            ts: Utc::now() };
        events.push(ev.clone());
        Ok(ev)
    }

    fn list(&self) -> Result<Vec<RunEvent>, CoreEngineError> {
        let events = self.inner.lock().map_err(|_| CoreEngineError::Storage("event log lock poisoned".into()))?;
        Ok(events.clone())
    }
}
