use std::fs;
use std::path::PathBuf;

use provision_core::{Checkpoint, CheckpointSession, CheckpointStore, CoreEngineError, EventStore, RunEventKind};
use provision_persistence::{FileEventLog, JsonCheckpointStore};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("provision-persistence-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

#[test]
fn absent_file_loads_as_empty_checkpoint() {
    let root = temp_root();
    let store = JsonCheckpointStore::new(root.join("deploy"), root.join("releases/2025010112_stokenet"));
    let cp = store.load("stokenet").unwrap();
    assert!(cp.is_empty());
    assert_eq!(cp.network(), "stokenet");
}

#[test]
fn flush_writes_canonical_and_archive_identically() {
    let root = temp_root();
    let store = JsonCheckpointStore::new(root.join("deploy"), root.join("releases/2025010112_stokenet"));
    let mut cp = Checkpoint::new("stokenet");
    cp.set("OWNER_RESOURCE", "resource_tdx_2_1a").unwrap();
    cp.set("AUTHORITY_RESOURCE", "resource_tdx_2_1b").unwrap();
    store.flush(&cp).unwrap();

    let canonical = fs::read(store.canonical_path("stokenet")).unwrap();
    let archive = fs::read(store.archive_path("stokenet")).unwrap();
    assert_eq!(canonical, archive);
    assert!(store.canonical_path("stokenet").ends_with("deploy/stokenet.config.json"));
    assert!(!root.join("deploy/stokenet.config.json.tmp").exists());

    let reloaded = store.load("stokenet").unwrap();
    assert_eq!(reloaded, cp);
}

#[test]
fn hand_edited_file_is_loaded() {
    let root = temp_root();
    let deploy = root.join("deploy");
    fs::create_dir_all(&deploy).unwrap();
    fs::write(deploy.join("mainnet.config.json"), r#"{ "VALIDATOR_ADDRESS": "validator_rdx1qqqqqq" }"#).unwrap();
    let store = JsonCheckpointStore::new(&deploy, root.join("archive"));
    assert_eq!(store.load("mainnet").unwrap().get("VALIDATOR_ADDRESS"), Some("validator_rdx1qqqqqq"));
}

#[test]
fn malformed_file_is_a_storage_error() {
    let root = temp_root();
    let deploy = root.join("deploy");
    fs::create_dir_all(&deploy).unwrap();
    fs::write(deploy.join("stokenet.config.json"), "[1, 2]").unwrap();
    let store = JsonCheckpointStore::new(&deploy, root.join("archive"));
    assert!(matches!(store.load("stokenet"), Err(CoreEngineError::Storage(_))));
}

#[test]
fn session_over_file_store_survives_reopen() {
    let root = temp_root();
    let store = JsonCheckpointStore::new(root.join("deploy"), root.join("archive"));
    {
        let mut session = CheckpointSession::open(&store, "stokenet").unwrap();
        session.commit("owner", &[("OWNER_RESOURCE".into(), "resource_tdx_2_1a".into())]).unwrap();
    }
    let again = CheckpointSession::open(&store, "stokenet").unwrap();
    assert_eq!(again.checkpoint().get("OWNER_RESOURCE"), Some("resource_tdx_2_1a"));
}

#[test]
fn journal_continues_numbering_and_skips_truncated_tail() {
    let root = temp_root();
    let path = root.join("deploy/stokenet.journal.jsonl");
    let run = Uuid::new_v4();
    {
        let log = FileEventLog::open(&path).unwrap();
        log.append_kind(run, RunEventKind::StepSkipped { step_id: "a".into() }).unwrap();
        log.append_kind(run, RunEventKind::StepSkipped { step_id: "b".into() }).unwrap();
    }
    // Caída a mitad de una escritura.
    let mut raw = fs::read_to_string(&path).unwrap();
    raw.push_str("{\"seq\":2,\"run_");
    fs::write(&path, raw).unwrap();

    let log = FileEventLog::open(&path).unwrap();
    assert_eq!(log.list().unwrap().len(), 2);
    let ev = log.append_kind(run, RunEventKind::RunFinished { committed: 0,
                                                               failed: false })
                .unwrap();
    assert_eq!(ev.seq, 2);
}
