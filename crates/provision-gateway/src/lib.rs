//! provision-gateway: cliente del servicio de indexado del ledger, firma local
//! de transacciones y un ledger simulado para tests.
pub mod account;
pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod network;
pub mod transaction;

pub use account::Account;
pub use client::{GatewayClient, TransactionStatus, DEFAULT_VALIDITY_MINUTES};
pub use error::GatewayError;
pub use http::HttpGateway;
pub use mock::{synthetic_address, MockGateway, ScriptedOutcome, ScriptedResult, Submission};
pub use network::{Network, NetworkConfiguration, WellKnownAddresses};
pub use transaction::{build_signed_transaction, decode_notarized_transaction, DecodedTransaction, IntentHash, SignedTransaction,
                      TransactionHeader};
