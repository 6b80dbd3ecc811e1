//! Registro de la cuenta como dApp definition del protocolo.

use provision_core::{CoreEngineError, ProvisionPlan};
use provision_manifest::{Address, Decimal, ManifestBuilder, MetadataValue};

use super::keys::*;
use super::steps::{TransactionStep, OWNER_BADGE_AMOUNT};

const CLAIMED_BY_DEFAULT: [&str; 6] = [ORACLE_PACKAGE, ORACLE_COMPONENT, KEEPER_PACKAGE, KEEPER_COMPONENT, INTEREST_PACKAGE, INTEREST_COMPONENT];

#[derive(Debug, Clone)]
pub struct DappDefinitionSettings {
    pub fee: Decimal,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub websites: Vec<String>,
    /// Claves del checkpoint cuyas entidades reclama la dApp.
    pub claimed: Vec<String>,
}

impl DappDefinitionSettings {
    pub fn new(fee: Decimal) -> Self {
        Self { fee,
               name: "DeXian".to_string(),
               description: "bringing greater liquidity and more efficient trading experience to Radix!".to_string(),
               icon_url: "https://dexian.io/images/icon_dapp.png".to_string(),
               websites: vec!["https://www.dexian.io".to_string(),
                              "https://stokenet.dexian.io".to_string(),
                              "https://testing.dexian.io".to_string()],
               claimed: CLAIMED_BY_DEFAULT.iter().map(|k| k.to_string()).collect() }
    }
}

pub fn dapp_definition_plan(settings: &DappDefinitionSettings) -> Result<ProvisionPlan, CoreEngineError> {
    let mut reads = vec![OWNER_RESOURCE];
    reads.extend(settings.claimed.iter().map(String::as_str));
    let settings = settings.clone();

    let step = TransactionStep::recording("dapp_definition", DAPP_DEFINITION_TX, &reads, move |ctx| {
        let account = ctx.account();
        let claimed = settings.claimed
                              .iter()
                              .map(|key| ctx.address(key))
                              .collect::<Result<Vec<Address>, _>>()?;
        Ok(ManifestBuilder::new().lock_fee(account, settings.fee)
                                 .create_proof_of_amount(account, &ctx.address(OWNER_RESOURCE)?, Decimal::from_int(OWNER_BADGE_AMOUNT))
                                 .set_metadata(account, "account_type", MetadataValue::String("dapp definition".into()))
                                 .set_metadata(account, "name", MetadataValue::String(settings.name.clone()))
                                 .set_metadata(account, "description", MetadataValue::String(settings.description.clone()))
                                 .set_metadata(account, "icon_url", MetadataValue::Url(settings.icon_url.clone()))
                                 .set_metadata(account, "claimed_entities", MetadataValue::GlobalAddressArray(claimed))
                                 .set_metadata(account, "claimed_websites", MetadataValue::OriginArray(settings.websites.clone()))
                                 .build())
    });
    ProvisionPlan::builder().step(step).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_claimed_entity_is_an_external_input() {
        let plan = dapp_definition_plan(&DappDefinitionSettings::new(Decimal::from_int(10))).unwrap();
        let inputs = plan.external_inputs();
        assert_eq!(inputs[0], OWNER_RESOURCE);
        assert!(inputs.iter().any(|k| k == ORACLE_COMPONENT));
        assert_eq!(inputs.len(), 7);
        assert_eq!(plan.output_keys(), vec![DAPP_DEFINITION_TX]);
    }
}
