//! provision-persistence: checkpoint en archivos JSON, journal JSONL y carga de `.env`.
pub mod config;
pub mod error;
pub mod file;
pub mod journal;

pub use config::{init_dotenv, StoreConfig};
pub use error::PersistenceError;
pub use file::JsonCheckpointStore;
pub use journal::FileEventLog;
