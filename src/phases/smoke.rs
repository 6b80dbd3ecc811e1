//! Transacciones de humo contra lo ya desplegado.

use provision_core::{CoreEngineError, ProvisionPlan};
use provision_manifest::{Decimal, ManifestBuilder, ManifestValue};

use super::keys::*;
use super::steps::TransactionStep;
use crate::funding::FAUCET_LOCK_FEE;

pub const SMOKE_BUCKET: &str = "bucket1";

#[derive(Debug, Clone)]
pub struct SmokeSettings {
    pub fee: Decimal,
    /// Monto retirado y re-depositado en la prueba de buckets.
    pub amount: Decimal,
    pub test_network: bool,
}

pub fn smoke_plan(settings: &SmokeSettings) -> Result<ProvisionPlan, CoreEngineError> {
    // Los tokens de prueba salen del faucet del protocolo: la prueba de buckets va después.
    let bucket_reads: &[&str] = if settings.test_network { &[USDC_RESOURCE, SMOKE_FAUCET_TX] } else { &[USDC_RESOURCE] };

    let claim = TransactionStep::recording("smoke_faucet", SMOKE_FAUCET_TX, &[FAUCET_COMPONENT], |ctx| {
        let faucet = ctx.run.well_known.faucet.as_ref().ok_or_else(|| {
                                                             CoreEngineError::InvalidPlan(format!("network {} has no faucet",
                                                                                                  ctx.run.network_name()))
                                                         })?;
        Ok(ManifestBuilder::new().call_method(faucet, "lock_fee", vec![ManifestValue::Decimal(Decimal::from_int(FAUCET_LOCK_FEE))])
                                 .call_method(faucet, "free", vec![])
                                 .call_method(&ctx.address(FAUCET_COMPONENT)?, "free_tokens", vec![])
                                 .deposit_all(ctx.account())
                                 .build())
    });

    let fee = settings.fee;
    let amount = settings.amount;
    let bucket = TransactionStep::recording("smoke_bucket", SMOKE_BUCKET_TX, bucket_reads, move |ctx| {
        let account = ctx.account();
        Ok(ManifestBuilder::new().lock_fee(account, fee)
                                 .withdraw_to_bucket(account, &ctx.address(USDC_RESOURCE)?, amount, SMOKE_BUCKET)
                                 .call_method(account, "deposit", vec![ManifestValue::Bucket(SMOKE_BUCKET.to_string())])
                                 .deposit_all(account)
                                 .build())
    });

    ProvisionPlan::builder().step_if(settings.test_network, claim).step(bucket).build()
}
