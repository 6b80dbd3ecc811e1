//! Implementación HTTP sobre el servicio de indexado del ledger.

use async_trait::async_trait;
use log::{debug, info};
use provision_manifest::{Address, Decimal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;

use crate::client::{GatewayClient, TransactionStatus};
use crate::error::GatewayError;
use crate::network::{NetworkConfiguration, WellKnownAddresses};
use crate::transaction::{IntentHash, SignedTransaction};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
    network: OnceCell<NetworkConfiguration>,
}

#[derive(Deserialize)]
struct NetworkConfigurationResponse {
    network_id: u8,
    network_name: String,
    well_known_addresses: WellKnownResponse,
}

#[derive(Deserialize)]
struct WellKnownResponse {
    xrd: String,
    #[serde(default)]
    faucet: Option<String>,
}

#[derive(Deserialize)]
struct FungiblesPage {
    items: Vec<FungibleItem>,
}

#[derive(Deserialize)]
struct FungibleItem {
    resource_address: String,
    amount: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    intent_status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct CommittedDetails {
    transaction: CommittedTransaction,
}

#[derive(Deserialize)]
struct CommittedTransaction {
    receipt: Receipt,
}

#[derive(Deserialize)]
struct Receipt {
    state_updates: StateUpdates,
}

#[derive(Deserialize)]
struct StateUpdates {
    new_global_entities: Vec<NewEntity>,
}

#[derive(Deserialize)]
struct NewEntity {
    entity_address: String,
}

#[derive(Deserialize)]
struct GatewayStatus {
    ledger_state: LedgerState,
}

#[derive(Deserialize)]
struct LedgerState {
    state_version: u64,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                                               .build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(),
                  client,
                  network: OnceCell::new() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("gateway:post path={path}");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { path: path.to_string(),
                                              status: status.as_u16(),
                                              body });
        }
        Ok(response.json::<T>().await?)
    }

    async fn fetch_network_configuration(&self) -> Result<NetworkConfiguration, GatewayError> {
        let raw: NetworkConfigurationResponse = self.post("/status/network-configuration", &json!({})).await?;
        let faucet = raw.well_known_addresses.faucet.as_deref().map(Address::parse).transpose()?;
        let well_known = WellKnownAddresses { xrd: Address::parse(&raw.well_known_addresses.xrd)?,
                                              faucet };
        let config = NetworkConfiguration::resolve(raw.network_id, &raw.network_name, well_known)?;
        info!("gateway:network name={} id={}", config.network_name, config.network_id);
        Ok(config)
    }
}

fn map_intent_status(raw: &StatusResponse) -> TransactionStatus {
    match raw.intent_status.as_str() {
        "CommittedSuccess" => TransactionStatus::Success,
        "CommittedFailure" | "PermanentlyRejected" | "Rejected" => {
            TransactionStatus::Failed { reason: raw.error_message.clone().unwrap_or_else(|| raw.intent_status.clone()) }
        }
        _ => TransactionStatus::Pending,
    }
}

#[async_trait]
impl GatewayClient for HttpGateway {
    async fn network_configuration(&self) -> Result<NetworkConfiguration, GatewayError> {
        self.network
            .get_or_try_init(|| self.fetch_network_configuration())
            .await
            .cloned()
    }

    async fn get_balance(&self, address: &Address) -> Result<Decimal, GatewayError> {
        let xrd = self.network_configuration().await?.well_known.xrd;
        let page: FungiblesPage = self.post("/state/entity/page/fungibles/", &json!({ "address": address.as_str() }))
                                      .await?;
        let balance = match page.items.iter().find(|item| item.resource_address == xrd.as_str()) {
            Some(item) => item.amount.parse::<Decimal>()?,
            None => Decimal::ZERO,
        };
        debug!("gateway:balance address={address} amount={balance}");
        Ok(balance)
    }

    async fn submit_transaction(&self, transaction: &SignedTransaction) -> Result<(), GatewayError> {
        let _: serde_json::Value = self.post("/transaction/submit",
                                             &json!({ "notarized_transaction_hex": transaction.payload_hex() }))
                                       .await?;
        info!("gateway:submitted intent={}", transaction.intent);
        Ok(())
    }

    async fn get_transaction_status(&self, intent: &IntentHash) -> Result<TransactionStatus, GatewayError> {
        let raw: StatusResponse = self.post("/transaction/status", &json!({ "intent_hash": intent.to_string() }))
                                      .await?;
        Ok(map_intent_status(&raw))
    }

    async fn get_new_addresses(&self, intent: &IntentHash) -> Result<Vec<Address>, GatewayError> {
        let body = json!({ "intent_hash": intent.to_string(), "opt_ins": { "receipt_state_changes": true } });
        let details: CommittedDetails = self.post("/transaction/committed-details", &body).await?;
        details.transaction
               .receipt
               .state_updates
               .new_global_entities
               .iter()
               .map(|entity| Address::parse(&entity.entity_address).map_err(GatewayError::from))
               .collect()
    }

    async fn get_state_version(&self) -> Result<u64, GatewayError> {
        let status: GatewayStatus = self.post("/status/gateway-status", &json!({})).await?;
        Ok(status.ledger_state.state_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(raw: &str) -> StatusResponse {
        StatusResponse { intent_status: raw.into(),
                         error_message: None }
    }

    #[test]
    fn intent_status_mapping() {
        assert_eq!(map_intent_status(&status("CommittedSuccess")), TransactionStatus::Success);
        assert_eq!(map_intent_status(&status("Unknown")), TransactionStatus::Pending);
        assert_eq!(map_intent_status(&status("Pending")), TransactionStatus::Pending);
        assert!(matches!(map_intent_status(&status("CommittedFailure")), TransactionStatus::Failed { .. }));
        assert!(matches!(map_intent_status(&status("Rejected")), TransactionStatus::Failed { .. }));
    }

    #[test]
    fn committed_details_preserve_address_order() {
        let raw = r#"{"transaction":{"receipt":{"state_updates":{"new_global_entities":[
            {"entity_address":"component_tdx_2_1qqqqqq"},
            {"entity_address":"resource_tdx_2_1pppppp"},
            {"entity_address":"resource_tdx_2_1zzzzzz"}]}}}}"#;
        let details: CommittedDetails = serde_json::from_str(raw).unwrap();
        let addresses: Vec<String> = details.transaction
                                            .receipt
                                            .state_updates
                                            .new_global_entities
                                            .into_iter()
                                            .map(|e| e.entity_address)
                                            .collect();
        assert_eq!(addresses,
                   vec!["component_tdx_2_1qqqqqq", "resource_tdx_2_1pppppp", "resource_tdx_2_1zzzzzz"]);
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let gateway = HttpGateway::new("https://stokenet.example.io/").unwrap();
        assert_eq!(gateway.base_url(), "https://stokenet.example.io");
    }
}
