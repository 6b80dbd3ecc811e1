//! ledger-provision
//!
//! Librería de orquestación del despliegue del protocolo sobre el ledger:
//! - `config` lee el entorno de la corrida.
//! - `funding` garantiza saldo suficiente antes de empezar.
//! - `phases` arma los planes de cada fase y los ejecuta.
//!
//! El binario `provision` (crate `provision-cli`) es una capa delgada encima.

pub mod config;
pub mod errors;
pub mod funding;
pub mod phases;

pub use config::ProvisionConfig;
pub use errors::{ExitCode, ProvisionError};
pub use funding::{FundingGuard, FundingOutcome, FundingPolicy};
pub use phases::{Phase, PhaseRunner, Preparation};
