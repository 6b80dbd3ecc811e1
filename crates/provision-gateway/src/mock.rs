//! Ledger simulado en proceso para tests.
//!
//! Decodifica cada payload enviado (verificando firma) y guarda el manifiesto
//! resultante, de modo que los tests pueden inspeccionar la estructura tal
//! como la "vio" el ledger. Los resultados se programan por envío, en orden.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use provision_manifest::{Address, Decimal, EntityKind, Instruction, Manifest, BECH32_CHARSET};

use crate::client::{GatewayClient, TransactionStatus};
use crate::error::GatewayError;
use crate::network::{Network, NetworkConfiguration, WellKnownAddresses};
use crate::transaction::{decode_notarized_transaction, IntentHash, SignedTransaction, TransactionHeader};

/// Resultado programado para el próximo envío.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResult {
    /// `None` genera una dirección por cada instrucción que crea una entidad.
    Success(Option<Vec<Address>>),
    Failure(String),
    /// El propio `submit_transaction` falla y no se registra nada.
    SubmitError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedOutcome {
    pub result: ScriptedResult,
    /// Consultas de estado que devuelven `Pending` antes del estado terminal.
    pub pending_polls: u32,
}

/// Un envío tal como lo recibió el ledger simulado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub intent: IntentHash,
    pub header: TransactionHeader,
    pub manifest: Manifest,
}

#[derive(Debug)]
struct IntentRecord {
    pending_left: u32,
    terminal: TransactionStatus,
    addresses: Vec<Address>,
}

#[derive(Debug)]
struct MockState {
    balances: VecDeque<Decimal>,
    last_balance: Decimal,
    balance_calls: u32,
    scripts: VecDeque<ScriptedOutcome>,
    submissions: Vec<Submission>,
    intents: HashMap<IntentHash, IntentRecord>,
    status_calls: u32,
    state_version: u64,
    address_counter: u64,
}

pub struct MockGateway {
    config: NetworkConfiguration,
    state: Mutex<MockState>,
}

/// Dirección sintética válida para la red dada; `seed` distinto, dirección distinta.
pub fn synthetic_address(kind: EntityKind, network: Network, seed: u64) -> Address {
    let charset = BECH32_CHARSET.as_bytes();
    let mut data = String::with_capacity(12);
    let mut n = seed;
    for _ in 0..12 {
        data.push(charset[(n % 32) as usize] as char);
        n /= 32;
    }
    let raw = format!("{}_{}1{}", kind.prefix(), network.hrp_suffix(), data);
    Address::parse(&raw).unwrap_or_else(|_| unreachable!("synthetic address {raw} uses the bech32 charset"))
}

fn created_entity(instruction: &Instruction) -> Option<EntityKind> {
    match instruction {
        Instruction::CreateFungibleResource(_) | Instruction::CreateNonFungibleResource(_) => Some(EntityKind::Resource),
        Instruction::PublishPackage { .. } => Some(EntityKind::Package),
        Instruction::CallFunction { .. } => Some(EntityKind::Component),
        _ => None,
    }
}

impl MockGateway {
    pub fn new(network: Network) -> Self {
        let faucet = network.is_test()
                            .then(|| synthetic_address(EntityKind::Component, network, u64::MAX));
        let well_known = WellKnownAddresses { xrd: synthetic_address(EntityKind::Resource, network, u64::MAX - 1),
                                              faucet };
        let config = NetworkConfiguration { network_id: network.id(),
                                            network_name: network.name().to_string(),
                                            network,
                                            well_known };
        Self { config,
               state: Mutex::new(MockState { balances: VecDeque::new(),
                                             last_balance: Decimal::from_int(1_000_000),
                                             balance_calls: 0,
                                             scripts: VecDeque::new(),
                                             submissions: Vec::new(),
                                             intents: HashMap::new(),
                                             status_calls: 0,
                                             state_version: 1,
                                             address_counter: 0 }) }
    }

    pub fn stokenet() -> Self {
        Self::new(Network::Stokenet)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Secuencia de balances; el último valor se repite indefinidamente.
    pub fn with_balances(self, balances: impl IntoIterator<Item = Decimal>) -> Self {
        {
            let mut state = self.lock();
            state.balances = balances.into_iter().collect();
            if let Some(last) = state.balances.back() {
                state.last_balance = *last;
            }
        }
        self
    }

    pub fn script(&self, outcome: ScriptedOutcome) {
        self.lock().scripts.push_back(outcome);
    }

    pub fn script_success(&self, addresses: Vec<Address>) {
        self.script(ScriptedOutcome { result: ScriptedResult::Success(Some(addresses)),
                                      pending_polls: 0 });
    }

    pub fn script_failure(&self, reason: &str) {
        self.script(ScriptedOutcome { result: ScriptedResult::Failure(reason.to_string()),
                                      pending_polls: 0 });
    }

    pub fn config(&self) -> &NetworkConfiguration {
        &self.config
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    pub fn balance_calls(&self) -> u32 {
        self.lock().balance_calls
    }

    pub fn status_calls(&self) -> u32 {
        self.lock().status_calls
    }

    fn next_address(state: &mut MockState, kind: EntityKind, network: Network) -> Address {
        state.address_counter += 1;
        synthetic_address(kind, network, state.address_counter)
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn network_configuration(&self) -> Result<NetworkConfiguration, GatewayError> {
        Ok(self.config.clone())
    }

    async fn get_balance(&self, _address: &Address) -> Result<Decimal, GatewayError> {
        let mut state = self.lock();
        state.balance_calls += 1;
        let balance = state.balances.pop_front().unwrap_or(state.last_balance);
        Ok(balance)
    }

    async fn submit_transaction(&self, transaction: &SignedTransaction) -> Result<(), GatewayError> {
        let decoded = decode_notarized_transaction(&transaction.payload)?;
        if decoded.header.network_id != self.config.network_id {
            return Err(GatewayError::InvalidPayload(format!("network id {} on a {} ledger",
                                                            decoded.header.network_id, self.config.network_name)));
        }
        let mut state = self.lock();
        let outcome = state.scripts.pop_front().unwrap_or(ScriptedOutcome { result: ScriptedResult::Success(None),
                                                                            pending_polls: 0 });
        let (terminal, addresses) = match outcome.result {
            ScriptedResult::SubmitError(message) => return Err(GatewayError::Http(message)),
            ScriptedResult::Failure(reason) => (TransactionStatus::Failed { reason }, Vec::new()),
            ScriptedResult::Success(Some(addresses)) => (TransactionStatus::Success, addresses),
            ScriptedResult::Success(None) => {
                let network = self.config.network;
                let kinds: Vec<EntityKind> = decoded.manifest.instructions.iter().filter_map(created_entity).collect();
                let addresses = kinds.into_iter()
                                     .map(|kind| Self::next_address(&mut state, kind, network))
                                     .collect();
                (TransactionStatus::Success, addresses)
            }
        };
        state.state_version += 1;
        state.intents.insert(decoded.intent.clone(),
                             IntentRecord { pending_left: outcome.pending_polls,
                                            terminal,
                                            addresses });
        state.submissions.push(Submission { intent: decoded.intent,
                                            header: decoded.header,
                                            manifest: decoded.manifest });
        Ok(())
    }

    async fn get_transaction_status(&self, intent: &IntentHash) -> Result<TransactionStatus, GatewayError> {
        let mut state = self.lock();
        state.status_calls += 1;
        // Intent desconocido: el ledger todavía no lo vio.
        let Some(record) = state.intents.get_mut(intent) else {
            return Ok(TransactionStatus::Pending);
        };
        if record.pending_left > 0 {
            record.pending_left -= 1;
            return Ok(TransactionStatus::Pending);
        }
        Ok(record.terminal.clone())
    }

    async fn get_new_addresses(&self, intent: &IntentHash) -> Result<Vec<Address>, GatewayError> {
        let state = self.lock();
        match state.intents.get(intent) {
            Some(record) if record.terminal == TransactionStatus::Success && record.pending_left == 0 => {
                Ok(record.addresses.clone())
            }
            _ => Err(GatewayError::NotCommitted(intent.to_string())),
        }
    }

    async fn get_state_version(&self) -> Result<u64, GatewayError> {
        Ok(self.lock().state_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_addresses_are_distinct_and_network_scoped() {
        let a = synthetic_address(EntityKind::Resource, Network::Stokenet, 1);
        let b = synthetic_address(EntityKind::Resource, Network::Stokenet, 2);
        assert_ne!(a, b);
        assert_eq!(a.network_suffix(), "tdx_2_");
        assert_eq!(synthetic_address(EntityKind::Package, Network::Mainnet, 1).network_suffix(), "rdx");
    }

    #[tokio::test]
    async fn balance_sequence_repeats_last_value() {
        let gateway = MockGateway::stokenet().with_balances([Decimal::from_int(5), Decimal::from_int(7)]);
        let account = synthetic_address(EntityKind::Account, Network::Stokenet, 1);
        assert_eq!(gateway.get_balance(&account).await.unwrap(), Decimal::from_int(5));
        assert_eq!(gateway.get_balance(&account).await.unwrap(), Decimal::from_int(7));
        assert_eq!(gateway.get_balance(&account).await.unwrap(), Decimal::from_int(7));
        assert_eq!(gateway.balance_calls(), 3);
    }
}
