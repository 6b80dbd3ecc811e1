//! Puntos de entrada por fase.
//!
//! Cada fase resuelve la red, valida la cuenta, pasa por el Funding Guard,
//! registra la versión de estado del ledger y recién entonces corre su plan.
//! Todas comparten el checkpoint de la red y son re-ejecutables.

pub mod bootstrap;
pub mod dapp_definition;
pub mod keeper;
pub mod keys;
pub mod smoke;
pub mod steps;

use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};
use provision_core::{CheckpointStore, EventStore, PollPolicy, ProvisionPlan, RunContext, RunReport, Sequencer};
use provision_gateway::{Account, GatewayClient};
use provision_manifest::Decimal;

use crate::errors::ProvisionError;
use crate::funding::{FundingGuard, FundingOutcome, FundingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bootstrap,
    DappDefinition,
    FillKeeper,
    Smoke,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Bootstrap => "bootstrap",
            Phase::DappDefinition => "dapp-definition",
            Phase::FillKeeper => "fill-keeper",
            Phase::Smoke => "smoke",
        }
    }

    /// Saldo mínimo para empezar y saldo a esperar cuando hay que fondear a mano.
    pub fn funding(&self) -> (Decimal, Decimal) {
        match self {
            Phase::Bootstrap => (Decimal::from_int(10_000), Decimal::from_int(30_000)),
            _ => (Decimal::from_int(1_000), Decimal::from_int(1_000)),
        }
    }

    pub fn default_fee(&self) -> Decimal {
        match self {
            Phase::Bootstrap => Decimal::from_int(100),
            _ => Decimal::from_int(10),
        }
    }
}

/// Resultado de la preparación de una fase.
#[derive(Debug, Clone)]
pub struct Preparation {
    pub ctx: RunContext,
    pub funding: FundingOutcome,
    pub state_version: Option<u64>,
}

pub struct PhaseRunner<'a> {
    gateway: &'a dyn GatewayClient,
    account: &'a Account,
    releases_dir: PathBuf,
    funding: Option<FundingPolicy>,
    poll: PollPolicy,
}

impl<'a> PhaseRunner<'a> {
    pub fn new(gateway: &'a dyn GatewayClient, account: &'a Account, releases_dir: impl Into<PathBuf>) -> Self {
        Self { gateway,
               account,
               releases_dir: releases_dir.into(),
               funding: None,
               poll: PollPolicy::default() }
    }

    /// Reemplaza la política por defecto de la fase.
    pub fn with_funding(mut self, policy: FundingPolicy) -> Self {
        self.funding = Some(policy);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn funding_policy(&self, phase: Phase) -> FundingPolicy {
        self.funding.unwrap_or_else(|| {
                        let (threshold, target) = phase.funding();
                        FundingPolicy::new(threshold).with_target(target)
                    })
    }

    pub async fn prepare(&self, phase: Phase) -> Result<Preparation, ProvisionError> {
        let config = self.gateway.network_configuration().await?;
        self.account.check_network(&config)?;
        info!("phase:start phase={} network={} account={}",
              phase.name(),
              config.network_name,
              self.account.address());

        let funding = FundingGuard::new(self.gateway, self.funding_policy(phase)).with_status_poll(self.poll)
                                                                                  .ensure_funded(self.account)
                                                                                  .await?;
        let state_version = match self.gateway.get_state_version().await {
            Ok(v) => {
                info!("phase:state_version phase={} state_version={v}", phase.name());
                Some(v)
            }
            Err(e) => {
                warn!("phase:state_version unavailable err={e}");
                None
            }
        };
        let ctx = RunContext::new(&config, self.account.address().clone(), &self.releases_dir, Utc::now());
        Ok(Preparation { ctx,
                         funding,
                         state_version })
    }

    /// `Err` sólo si la corrida no pudo empezar; el fallo de un step queda en el reporte.
    pub async fn execute(&self,
                         ctx: &RunContext,
                         plan: &ProvisionPlan,
                         store: &dyn CheckpointStore,
                         journal: &dyn EventStore)
                         -> Result<RunReport, ProvisionError> {
        let report = Sequencer::new(self.gateway, self.account, store, journal).with_poll_policy(self.poll)
                                                                               .run(ctx, plan)
                                                                               .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_waits_for_more_funds_than_later_phases() {
        assert_eq!(Phase::Bootstrap.funding(), (Decimal::from_int(10_000), Decimal::from_int(30_000)));
        assert_eq!(Phase::Smoke.funding().0, Decimal::from_int(1_000));
        assert_eq!(Phase::FillKeeper.default_fee(), Decimal::from_int(10));
    }
}
