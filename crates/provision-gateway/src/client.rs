//! Contrato del cliente de gateway.
//!
//! El cliente no guarda estado de la corrida: cada operación es una consulta o
//! un envío independiente. No reintenta internamente; los bucles de espera
//! pertenecen a quien llama (Funding Guard, Sequencer).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use provision_manifest::{Address, Decimal, Manifest};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::GatewayError;
use crate::network::NetworkConfiguration;
use crate::transaction::{build_signed_transaction, IntentHash, SignedTransaction};

/// Ventana de validez por defecto de una transacción.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed { reason: String },
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Metadatos estáticos de la red. Red desconocida es error fatal.
    async fn network_configuration(&self) -> Result<NetworkConfiguration, GatewayError>;

    /// Balance del recurso nativo de la red.
    async fn get_balance(&self, address: &Address) -> Result<Decimal, GatewayError>;

    /// Firma localmente; la ventana de validez sale del reloj de pared.
    async fn build_transaction(&self, manifest: &Manifest, account: &Account) -> Result<SignedTransaction, GatewayError> {
        let config = self.network_configuration().await?;
        build_signed_transaction(manifest,
                                 account,
                                 config.network_id,
                                 Utc::now(),
                                 Duration::minutes(DEFAULT_VALIDITY_MINUTES))
    }

    /// Envía sin esperar finalidad.
    async fn submit_transaction(&self, transaction: &SignedTransaction) -> Result<(), GatewayError>;

    async fn get_transaction_status(&self, intent: &IntentHash) -> Result<TransactionStatus, GatewayError>;

    /// Direcciones creadas por el intent, en el orden que reporta el ledger.
    /// Sólo tiene sentido tras `TransactionStatus::Success`.
    async fn get_new_addresses(&self, intent: &IntentHash) -> Result<Vec<Address>, GatewayError>;

    /// Contador monotónico del ledger, sólo para auditoría.
    async fn get_state_version(&self) -> Result<u64, GatewayError>;
}
