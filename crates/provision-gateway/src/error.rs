//! Errores del cliente de gateway.

use provision_manifest::ManifestError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("unsupported network: {0}")]
    UnknownNetwork(String),
    #[error("http transport error: {0}")]
    Http(String),
    #[error("gateway returned status {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("account {address} does not belong to network {network}")]
    AccountNetworkMismatch { address: String, network: String },
    #[error("invalid transaction payload: {0}")]
    InvalidPayload(String),
    #[error("signature verification failed")]
    BadSignature,
    #[error("transaction {0} has not committed successfully")]
    NotCommitted(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
