//! Configuración de directorios desde variables de entorno.
//! Usa `DEPLOY_DIR` (checkpoints canónicos y journal) y `RELEASES_DIR` (archivo).

use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_DEPLOY_DIR: &str = "deploy";
pub const DEFAULT_RELEASES_DIR: &str = "releases";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub deploy_dir: PathBuf,
    pub releases_dir: PathBuf,
}

impl StoreConfig {
    /// Arma la configuración con `lookup` (normalmente el entorno ya cargado).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));
        Self { deploy_dir: dir("DEPLOY_DIR", DEFAULT_DEPLOY_DIR),
               releases_dir: dir("RELEASES_DIR", DEFAULT_RELEASES_DIR) }
    }

    pub fn journal_path(&self, network: &str) -> PathBuf {
        self.deploy_dir.join(format!("{network}.journal.jsonl"))
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
