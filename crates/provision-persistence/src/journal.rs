//! Journal de corridas en JSONL: una línea por evento, sólo append.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use log::{debug, warn};
use provision_core::{CoreEngineError, EventStore, RunEvent, RunEventKind};
use uuid::Uuid;

use crate::error::PersistenceError;

pub struct FileEventLog {
    path: PathBuf,
    next_seq: Mutex<u64>,
}

impl FileEventLog {
    /// Abre (o crea) el journal y continúa la numeración existente.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let next_seq = read_events(&path)?.last().map(|e| e.seq + 1).unwrap_or(0);
        debug!("journal:open path={} next_seq={next_seq}", path.display());
        Ok(Self { path,
                  next_seq: Mutex::new(next_seq) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, run_id: Uuid, kind: RunEventKind) -> Result<RunEvent, PersistenceError> {
        let mut next = self.next_seq
                           .lock()
                           .map_err(|_| PersistenceError::corrupt(&self.path, "journal lock poisoned"))?;
        let ev = RunEvent { seq: *next,
                            run_id,
                            kind,
                            ts: Utc::now() };
        let mut line = serde_json::to_vec(&ev)?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true)
                                         .append(true)
                                         .open(&self.path)
                                         .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.write_all(&line).map_err(|e| PersistenceError::io(&self.path, e))?;
        file.sync_data().map_err(|e| PersistenceError::io(&self.path, e))?;
        *next += 1;
        debug!("journal:append seq={} kind={}", ev.seq, ev.kind.variant_name());
        Ok(ev)
    }
}

/// Lee todos los eventos. Una última línea truncada (caída a mitad de
/// escritura) se descarta; una línea inválida en el medio es corrupción.
fn read_events(path: &Path) -> Result<Vec<RunEvent>, PersistenceError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut events = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        match serde_json::from_str::<RunEvent>(line) {
            Ok(ev) => events.push(ev),
            Err(e) if idx + 1 == lines.len() => {
                warn!("journal:truncated_tail path={} err={e}", path.display());
            }
            Err(e) => return Err(PersistenceError::corrupt(path, format!("line {}: {e}", idx + 1))),
        }
    }
    Ok(events)
}

impl EventStore for FileEventLog {
    fn append_kind(&self, run_id: Uuid, kind: RunEventKind) -> Result<RunEvent, CoreEngineError> {
        Ok(self.append(run_id, kind)?)
    }

    fn list(&self) -> Result<Vec<RunEvent>, CoreEngineError> {
        Ok(read_events(&self.path)?)
    }
}
