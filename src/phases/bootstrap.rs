//! Fase inicial: badges de control, recurso base, y los paquetes y componentes
//! del protocolo en orden de dependencia.
//!
//! En redes de prueba se agrega el faucet del protocolo, que crea los recursos
//! USDC/USDT de prueba.

use std::sync::Arc;

use provision_core::{CoreEngineError, ProvisionPlan, StepContext};
use provision_manifest::{AccessRule, Decimal, FungibleResourceDefinition, FungibleResourceRoles, Manifest, ManifestBuilder, ManifestValue,
                         MetadataConfig, MetadataEntry, MetadataValue, OwnerRole, RoleAssignment, ToManifestValue};
use provision_toolchain::ArtifactBuilder;

use super::keys::*;
use super::steps::{protocol_owner_role, PackageOwner, PublishStep, TransactionStep};

/// Parámetros del modelo de interés por defecto.
pub const INTEREST_MODEL_PARAMS: [&str; 4] = ["0.2", "0.5", "0.55", "0.45"];
/// Antigüedad máxima de un precio aceptado por el oráculo.
pub const ORACLE_MAX_PRICE_AGE: u64 = 3000;

/// Claves que el toolchain recibe al compilar los paquetes del protocolo.
const COMPILE_INPUTS: [&str; 4] = [OWNER_RESOURCE, AUTHORITY_RESOURCE, BASE_AUTHORITY_RESOURCE, BASE_RESOURCE];

#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub fee: Decimal,
    pub oracle_public_key: String,
    /// Pasos exclusivos de redes de prueba.
    pub test_network: bool,
}

fn text(value: &str) -> MetadataEntry {
    MetadataEntry::locked(MetadataValue::String(value.to_string()))
}

fn url(value: &str) -> MetadataEntry {
    MetadataEntry::locked(MetadataValue::Url(value.to_string()))
}

fn badge(fee: Decimal, ctx: &StepContext<'_>, divisibility: u8, supply: i64, metadata: MetadataConfig) -> Manifest {
    let definition = FungibleResourceDefinition { owner_role: OwnerRole::None,
                                                  track_total_supply: true,
                                                  divisibility,
                                                  initial_supply: Some(Decimal::from_int(supply)),
                                                  roles: FungibleResourceRoles::default(),
                                                  metadata };
    ManifestBuilder::new().lock_fee(ctx.account(), fee)
                          .create_fungible_resource(definition)
                          .deposit_all(ctx.account())
                          .build()
}

fn owner_badge(fee: Decimal) -> TransactionStep {
    TransactionStep::creating("mint_owner_badge", &[OWNER_RESOURCE], &[], move |ctx| {
        let metadata = MetadataConfig::new().with("name", text("dexian protocol gov badge"))
                                            .with("symbol", text("OWN"))
                                            .with("description", text("With power comes responsibility."))
                                            .with("icon_url", url("https://dexian.io/images/owner_token.png"))
                                            .with("info_url", url("https://dexian.io"));
        Ok(badge(fee, ctx, 0, 9, metadata))
    })
}

fn authority(fee: Decimal, id: &str, output: &str, name: &str, symbol: &str) -> TransactionStep {
    let (name, symbol) = (name.to_string(), symbol.to_string());
    let description = format!("dexian protocol {}.", name.to_lowercase());
    TransactionStep::creating(id, &[output], &[], move |ctx| {
        let metadata = MetadataConfig::new().with("name", text(&name))
                                            .with("symbol", text(&symbol))
                                            .with("description", text(&description));
        Ok(badge(fee, ctx, 18, 1, metadata))
    })
}

/// Recurso base: mint sólo con la base authority, burn libre, metadata editable por el owner.
fn base_resource(fee: Decimal) -> TransactionStep {
    TransactionStep::creating("create_base", &[BASE_RESOURCE], &[OWNER_RESOURCE, BASE_AUTHORITY_RESOURCE], move |ctx| {
        let roles = FungibleResourceRoles { mint: Some(RoleAssignment::locked(AccessRule::require(ctx.address(BASE_AUTHORITY_RESOURCE)?))),
                                            burn: Some(RoleAssignment::locked(AccessRule::AllowAll)),
                                            ..FungibleResourceRoles::default() };
        let editable = MetadataEntry::updatable;
        let metadata =
            MetadataConfig::new().with("name", editable(MetadataValue::String("Surge USD".into())))
                                 .with("symbol", editable(MetadataValue::String("sUSD".into())))
                                 .with("description", editable(MetadataValue::String("Surge wrapped USD.".into())))
                                 .with("icon_url", editable(MetadataValue::Url("https://surge.trade/images/susd_token.png".into())))
                                 .with("info_url", editable(MetadataValue::Url("https://surge.trade".into())));
        let definition = FungibleResourceDefinition { owner_role: protocol_owner_role(ctx)?,
                                                      track_total_supply: true,
                                                      divisibility: 18,
                                                      initial_supply: None,
                                                      roles,
                                                      metadata };
        Ok(ManifestBuilder::new().lock_fee(ctx.account(), fee)
                                 .create_fungible_resource(definition)
                                 .build())
    })
}

fn faucet_component(fee: Decimal) -> TransactionStep {
    TransactionStep::creating("instantiate_faucet",
                              &[FAUCET_COMPONENT, FAUCET_OWNER_RESOURCE, USDC_RESOURCE, USDT_RESOURCE],
                              &[FAUCET_PACKAGE],
                              move |ctx| {
                                  Ok(ManifestBuilder::new().lock_fee(ctx.account(), fee)
                                                           .call_function(&ctx.address(FAUCET_PACKAGE)?, "Faucet", "new", vec![])
                                                           .deposit_all(ctx.account())
                                                           .build())
                              })
}

/// Instancia un blueprint cuyos argumentos dependen del contexto.
fn instantiate<F>(fee: Decimal, id: &str, output: &str, package_key: &'static str, blueprint: &'static str, args: F) -> TransactionStep
    where F: Fn(&StepContext<'_>) -> Result<Vec<ManifestValue>, CoreEngineError> + Send + Sync + 'static
{
    TransactionStep::creating(id, &[output], &[package_key], move |ctx| {
        Ok(ManifestBuilder::new().lock_fee(ctx.account(), fee)
                                 .call_function(&ctx.address(package_key)?, blueprint, "instantiate", args(ctx)?)
                                 .build())
    })
}

fn interest_params() -> Result<Vec<ManifestValue>, CoreEngineError> {
    INTEREST_MODEL_PARAMS.iter()
                         .map(|raw| {
                             raw.parse::<Decimal>()
                                .map(ManifestValue::Decimal)
                                .map_err(|e| CoreEngineError::Internal(e.to_string()))
                         })
                         .collect()
}

pub fn bootstrap_plan(settings: &BootstrapSettings, builder: Arc<dyn ArtifactBuilder>) -> Result<ProvisionPlan, CoreEngineError> {
    let fee = settings.fee;
    let oracle_key = settings.oracle_public_key.clone();
    let keeper_inputs = COMPILE_INPUTS;
    let interest_inputs = [OWNER_RESOURCE, AUTHORITY_RESOURCE, BASE_AUTHORITY_RESOURCE, BASE_RESOURCE, KEEPER_COMPONENT];
    let oracle_inputs = [OWNER_RESOURCE,
                         AUTHORITY_RESOURCE,
                         BASE_AUTHORITY_RESOURCE,
                         BASE_RESOURCE,
                         KEEPER_COMPONENT,
                         INTEREST_COMPONENT];

    ProvisionPlan::builder().step(owner_badge(fee))
                            .step(authority(fee, "mint_authority", AUTHORITY_RESOURCE, "Authority", "AUTH"))
                            .step(authority(fee, "mint_base_authority", BASE_AUTHORITY_RESOURCE, "Base Authority", "BAUTH"))
                            .step(base_resource(fee))
                            .step_if(settings.test_network,
                                     PublishStep::new("faucet", FAUCET_PACKAGE, &COMPILE_INPUTS, PackageOwner::None, fee, builder.clone()))
                            .step_if(settings.test_network, faucet_component(fee))
                            .step(PublishStep::new("keeper", KEEPER_PACKAGE, &keeper_inputs, PackageOwner::Protocol, fee, builder.clone()))
                            .step(instantiate(fee, "instantiate_keeper", KEEPER_COMPONENT, KEEPER_PACKAGE, "ValidatorKeeper", |ctx| {
                                      Ok(vec![protocol_owner_role(ctx)?.to_value()])
                                  }))
                            .step(PublishStep::new("interest",
                                                   INTEREST_PACKAGE,
                                                   &interest_inputs,
                                                   PackageOwner::Protocol,
                                                   fee,
                                                   builder.clone()))
                            .step(instantiate(fee,
                                              "instantiate_interest",
                                              INTEREST_COMPONENT,
                                              INTEREST_PACKAGE,
                                              "DefInterestModel",
                                              |_| interest_params()))
                            .step(PublishStep::new("oracle", ORACLE_PACKAGE, &oracle_inputs, PackageOwner::Protocol, fee, builder))
                            .step(instantiate(fee, "instantiate_oracle", ORACLE_COMPONENT, ORACLE_PACKAGE, "PriceOracle", move |ctx| {
                                      Ok(vec![protocol_owner_role(ctx)?.to_value(),
                                              ManifestValue::string(oracle_key.clone()),
                                              ManifestValue::U64(ORACLE_MAX_PRICE_AGE)])
                                  }))
                            .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provision_core::BuildEnv;
    use provision_toolchain::{Artifacts, BuildError};
    use std::path::Path;

    struct NoBuild;

    #[async_trait]
    impl ArtifactBuilder for NoBuild {
        async fn build(&self, component: &str, _env: &BuildEnv, _archive_dir: &Path) -> Result<Artifacts, BuildError> {
            Err(BuildError::MissingArtifact { component: component.to_string(),
                                              path: String::new() })
        }
    }

    fn settings(test_network: bool) -> BootstrapSettings {
        BootstrapSettings { fee: Decimal::from_int(100),
                            oracle_public_key: "ab".repeat(32),
                            test_network }
    }

    #[test]
    fn test_network_plan_includes_the_faucet() {
        let plan = bootstrap_plan(&settings(true), Arc::new(NoBuild)).unwrap();
        assert_eq!(plan.step_ids(),
                   vec!["mint_owner_badge",
                        "mint_authority",
                        "mint_base_authority",
                        "create_base",
                        "publish_faucet",
                        "instantiate_faucet",
                        "publish_keeper",
                        "instantiate_keeper",
                        "publish_interest",
                        "instantiate_interest",
                        "publish_oracle",
                        "instantiate_oracle"]);
        assert!(plan.external_inputs().is_empty());
    }

    #[test]
    fn production_plan_skips_the_faucet() {
        let plan = bootstrap_plan(&settings(false), Arc::new(NoBuild)).unwrap();
        assert!(!plan.produces(FAUCET_COMPONENT));
        assert!(!plan.produces(USDC_RESOURCE));
        assert_eq!(plan.len(), 10);
    }

    #[test]
    fn interest_params_are_exact_decimals() {
        let params = interest_params().unwrap();
        let rendered: Vec<String> = params.iter().map(|v| v.as_decimal().unwrap().to_string()).collect();
        assert_eq!(rendered, vec!["0.2", "0.5", "0.55", "0.45"]);
    }
}
