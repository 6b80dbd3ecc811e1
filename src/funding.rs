//! Funding Guard: ningún step empieza mientras el saldo esté bajo el umbral.
//!
//! En redes de prueba se pide primero al faucet. Si el saldo sigue corto (o la
//! red es de producción) se muestra la dirección a fondear y se consulta el
//! saldo a intervalo fijo. La espera no tiene límite salvo `max_polls`.

use std::time::Duration;

use log::{debug, info, warn};
use provision_core::PollPolicy;
use provision_gateway::{Account, GatewayClient, TransactionStatus};
use provision_manifest::{Address, Decimal, Manifest, ManifestBuilder, ManifestValue};

use crate::errors::ProvisionError;

/// Fee que se bloquea contra el faucet al reclamar.
pub const FAUCET_LOCK_FEE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingPolicy {
    /// Por debajo de este saldo la corrida no empieza.
    pub threshold: Decimal,
    /// Saldo que se espera alcanzar una vez que hizo falta fondear.
    pub target: Decimal,
    pub poll_interval: Duration,
    /// `None` = espera sin límite.
    pub max_polls: Option<u32>,
}

impl FundingPolicy {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold,
               target: threshold,
               poll_interval: Duration::from_secs(5),
               max_polls: None }
    }

    /// El objetivo nunca queda por debajo del umbral.
    pub fn with_target(mut self, target: Decimal) -> Self {
        self.target = target.max(self.threshold);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingOutcome {
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    /// Consultas de saldo posteriores a la inicial.
    pub polls: u32,
    pub faucet_claimed: bool,
}

pub struct FundingGuard<'a> {
    gateway: &'a dyn GatewayClient,
    policy: FundingPolicy,
    status_poll: PollPolicy,
}

impl<'a> FundingGuard<'a> {
    pub fn new(gateway: &'a dyn GatewayClient, policy: FundingPolicy) -> Self {
        Self { gateway,
               policy,
               status_poll: PollPolicy::default() }
    }

    /// Política de espera del estado de la transacción del faucet.
    pub fn with_status_poll(mut self, status_poll: PollPolicy) -> Self {
        self.status_poll = status_poll;
        self
    }

    pub async fn ensure_funded(&self, account: &Account) -> Result<FundingOutcome, ProvisionError> {
        let address = account.address();
        let initial_balance = self.gateway.get_balance(address).await?;
        let mut outcome = FundingOutcome { initial_balance,
                                           final_balance: initial_balance,
                                           polls: 0,
                                           faucet_claimed: false };
        if initial_balance >= self.policy.threshold {
            debug!("funding:ok account={address} balance={initial_balance}");
            return Ok(outcome);
        }

        let config = self.gateway.network_configuration().await?;
        if let Some(faucet) = config.well_known.faucet.as_ref().filter(|_| config.is_test_network()) {
            info!("funding:faucet account={address} balance={initial_balance} threshold={}", self.policy.threshold);
            outcome.faucet_claimed = self.claim_faucet(faucet, account).await?;
            outcome.final_balance = self.poll_balance(address, &mut outcome.polls).await?;
            if outcome.final_balance >= self.policy.threshold {
                return Ok(outcome);
            }
        }

        warn!("funding:required fund account {address} balance={} target={}",
              outcome.final_balance,
              self.policy.target);
        while outcome.final_balance < self.policy.target {
            if self.policy.max_polls.is_some_and(|max| outcome.polls >= max) {
                return Err(ProvisionError::FundingTimeout { polls: outcome.polls,
                                                            balance: outcome.final_balance.to_string(),
                                                            target: self.policy.target.to_string() });
            }
            tokio::time::sleep(self.policy.poll_interval).await;
            match self.poll_balance(address, &mut outcome.polls).await {
                Ok(balance) => outcome.final_balance = balance,
                Err(e) => warn!("funding:balance query failed account={address} err={e}"),
            }
        }
        info!("funding:done account={address} balance={} polls={}", outcome.final_balance, outcome.polls);
        Ok(outcome)
    }

    async fn poll_balance(&self, address: &Address, polls: &mut u32) -> Result<Decimal, ProvisionError> {
        *polls += 1;
        let balance = self.gateway.get_balance(address).await?;
        debug!("funding:poll account={address} balance={balance} poll={polls}");
        Ok(balance)
    }

    /// `true` si la transacción del faucet se comprometió con éxito.
    async fn claim_faucet(&self, faucet: &Address, account: &Account) -> Result<bool, ProvisionError> {
        let manifest = faucet_claim_manifest(faucet, account.address());
        let tx = self.gateway.build_transaction(&manifest, account).await?;
        self.gateway.submit_transaction(&tx).await?;
        let started = tokio::time::Instant::now();
        loop {
            match self.gateway.get_transaction_status(&tx.intent).await? {
                TransactionStatus::Success => {
                    info!("funding:faucet committed intent={}", tx.intent);
                    return Ok(true);
                }
                TransactionStatus::Failed { reason } => {
                    warn!("funding:faucet failed intent={} reason={reason}", tx.intent);
                    return Ok(false);
                }
                TransactionStatus::Pending => {}
            }
            if self.status_poll.timeout.is_some_and(|t| started.elapsed() >= t) {
                warn!("funding:faucet still pending intent={}", tx.intent);
                return Ok(false);
            }
            tokio::time::sleep(self.status_poll.interval).await;
        }
    }
}

/// Fee pagado por el faucet, `free` y depósito de todo en la cuenta.
pub fn faucet_claim_manifest(faucet: &Address, account: &Address) -> Manifest {
    ManifestBuilder::new().call_method(faucet, "lock_fee", vec![ManifestValue::Decimal(Decimal::from_int(FAUCET_LOCK_FEE))])
                          .call_method(faucet, "free", vec![])
                          .deposit_all(account)
                          .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_gateway::{synthetic_address, MockGateway, Network};
    use provision_manifest::{EntityKind, Instruction};

    fn account(network: Network) -> Account {
        Account::from_hex(&"2a".repeat(32), synthetic_address(EntityKind::Account, network, 7)).unwrap()
    }

    fn dec(v: i64) -> Decimal {
        Decimal::from_int(v)
    }

    fn fast(threshold: i64) -> FundingPolicy {
        FundingPolicy::new(dec(threshold)).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn waits_until_threshold_is_crossed() {
        let gateway = MockGateway::new(Network::Mainnet).with_balances([dec(500), dec(500), dec(1500)]);
        let outcome = FundingGuard::new(&gateway, fast(1000)).ensure_funded(&account(Network::Mainnet))
                                                             .await
                                                             .unwrap();
        assert_eq!(outcome.polls, 2);
        assert_eq!(outcome.initial_balance, dec(500));
        assert_eq!(outcome.final_balance, dec(1500));
        assert!(!outcome.faucet_claimed);
        assert_eq!(gateway.submission_count(), 0);
    }

    #[tokio::test]
    async fn funded_account_proceeds_without_polling() {
        let gateway = MockGateway::new(Network::Mainnet).with_balances([dec(20_000)]);
        let outcome = FundingGuard::new(&gateway, fast(10_000)).ensure_funded(&account(Network::Mainnet))
                                                               .await
                                                               .unwrap();
        assert_eq!(outcome.polls, 0);
        assert_eq!(gateway.balance_calls(), 1);
    }

    #[tokio::test]
    async fn test_network_claims_from_faucet_first() {
        let gateway = MockGateway::stokenet().with_balances([dec(0), dec(10_000)]);
        let acct = account(Network::Stokenet);
        let outcome = FundingGuard::new(&gateway, fast(10_000)).ensure_funded(&acct).await.unwrap();
        assert!(outcome.faucet_claimed);
        assert_eq!(outcome.polls, 1);

        let submitted = gateway.submissions();
        assert_eq!(submitted.len(), 1);
        let faucet = gateway.config().well_known.faucet.clone().unwrap();
        assert!(matches!(&submitted[0].manifest.instructions[1],
                         Instruction::CallMethod { address, method, .. } if *address == faucet && method == "free"));
    }

    #[tokio::test]
    async fn bounded_wait_reports_timeout() {
        let gateway = MockGateway::new(Network::Mainnet).with_balances([dec(10)]);
        let err = FundingGuard::new(&gateway, fast(1000).with_max_polls(3)).ensure_funded(&account(Network::Mainnet))
                                                                           .await
                                                                           .unwrap_err();
        assert!(matches!(err, ProvisionError::FundingTimeout { polls: 3, .. }));
    }

    #[test]
    fn target_never_drops_below_threshold() {
        let policy = FundingPolicy::new(dec(10_000)).with_target(dec(5));
        assert_eq!(policy.target, dec(10_000));
        assert_eq!(FundingPolicy::new(dec(10_000)).with_target(dec(30_000)).target, dec(30_000));
    }
}
