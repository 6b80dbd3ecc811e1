//! Carga de datos operativos: historial de staking del validador en el keeper
//! y cotizaciones iniciales del oráculo.

use provision_core::{CoreEngineError, ProvisionPlan};
use provision_manifest::{Address, Decimal, ManifestBuilder, ManifestValue, ValueKind};

use super::keys::*;
use super::steps::TransactionStep;

/// `(stake, unidades del pool, época)` por registro.
pub const VALIDATOR_STAKING_HISTORY: [(&str, &str, u64); 11] =
    [("112237180.296872849296766891", "106945526.373340375151046984", 86688),
     ("112098789.798285268715788744", "106941612.989392488139496828", 84672),
     ("111959502.729679940898983504", "106937614.480396442958605832", 82656),
     ("111812504.140792595817896675", "106927142.751198134517340198", 80640),
     ("111671430.762427438906729348", "106922321.81834615851120144", 78624),
     ("111531123.578410529527003172", "106918421.298990062333924856", 76608),
     ("111391249.978008627097998059", "106913368.20277604878239515", 74592),
     ("111217613.872691674663641253", "106879479.885389093107931943", 72576),
     ("111069369.324371512654697253", "106869097.447947881260897466", 70560),
     ("108415946.518229418502963481", "104444698.30595915458410914", 68544),
     ("108277396.093980704102555695", "104440978.133015624626436059", 66528)];

pub const DEFAULT_PRICE_IN_XRD: &str = "145.25050961";

#[derive(Debug, Clone)]
pub struct KeeperSettings {
    pub fee: Decimal,
    pub validator: Address,
    pub staking: Vec<(Decimal, Decimal, u64)>,
    pub price_in_xrd: Decimal,
}

impl KeeperSettings {
    pub fn new(fee: Decimal, validator: Address) -> Result<Self, CoreEngineError> {
        let parse = |raw: &str| raw.parse::<Decimal>().map_err(|e| CoreEngineError::Internal(e.to_string()));
        let staking = VALIDATOR_STAKING_HISTORY.iter()
                                               .map(|(stake, units, epoch)| Ok((parse(stake)?, parse(units)?, *epoch)))
                                               .collect::<Result<Vec<_>, CoreEngineError>>()?;
        Ok(Self { fee,
                  validator,
                  staking,
                  price_in_xrd: parse(DEFAULT_PRICE_IN_XRD)? })
    }
}

pub fn staking_rows(rows: &[(Decimal, Decimal, u64)]) -> ManifestValue {
    let tuples = rows.iter()
                     .map(|(stake, units, epoch)| {
                         ManifestValue::Tuple(vec![ManifestValue::Decimal(*stake),
                                                   ManifestValue::Decimal(*units),
                                                   ManifestValue::U64(*epoch)])
                     })
                     .collect();
    ManifestValue::array(ValueKind::Tuple, tuples)
}

pub fn fill_keeper_plan(settings: &KeeperSettings) -> Result<ProvisionPlan, CoreEngineError> {
    let staking = settings.clone();
    let fill = TransactionStep::recording("fill_validator_staking",
                                          KEEPER_STAKING_TX,
                                          &[AUTHORITY_RESOURCE, KEEPER_COMPONENT],
                                          move |ctx| {
                                              let account = ctx.account();
                                              Ok(ManifestBuilder::new().lock_fee(account, staking.fee)
                                                                       .create_proof_of_amount(account,
                                                                                               &ctx.address(AUTHORITY_RESOURCE)?,
                                                                                               Decimal::ONE)
                                                                       .call_method(&ctx.address(KEEPER_COMPONENT)?,
                                                                                    "fill_validator_staking",
                                                                                    vec![ManifestValue::Address(staking.validator.clone()),
                                                                                         staking_rows(&staking.staking)])
                                                                       .build())
                                          });

    let fee = settings.fee;
    let price = settings.price_in_xrd;
    let prices = TransactionStep::recording("set_oracle_prices",
                                            ORACLE_PRICES_TX,
                                            &[BASE_AUTHORITY_RESOURCE, ORACLE_COMPONENT, USDT_RESOURCE, USDC_RESOURCE],
                                            move |ctx| {
                                                let account = ctx.account();
                                                let oracle = ctx.address(ORACLE_COMPONENT)?;
                                                let mut builder =
                                                    ManifestBuilder::new().lock_fee(account, fee)
                                                                          .create_proof_of_amount(account,
                                                                                                  &ctx.address(BASE_AUTHORITY_RESOURCE)?,
                                                                                                  Decimal::ONE);
                                                for key in [USDT_RESOURCE, USDC_RESOURCE] {
                                                    builder = builder.call_method(&oracle,
                                                                                  "set_price_quote_in_xrd",
                                                                                  vec![ManifestValue::Address(ctx.address(key)?),
                                                                                       ManifestValue::Decimal(price)]);
                                                }
                                                Ok(builder.build())
                                            });

    ProvisionPlan::builder().step(fill).step(prices).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_gateway::{synthetic_address, Network};
    use provision_manifest::EntityKind;

    #[test]
    fn staking_history_parses_into_typed_rows() {
        let validator = synthetic_address(EntityKind::Validator, Network::Stokenet, 1);
        let settings = KeeperSettings::new(Decimal::from_int(10), validator).unwrap();
        assert_eq!(settings.staking.len(), 11);
        assert_eq!(settings.staking[0].2, 86688);
        assert_eq!(settings.staking[4].1.to_string(), "106922321.81834615851120144");

        let rows = staking_rows(&settings.staking[..2]);
        let elements = rows.as_array().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].as_tuple().unwrap()[2].as_u64().unwrap(), 84672);
    }

    #[test]
    fn plan_reads_bootstrap_outputs() {
        let validator = synthetic_address(EntityKind::Validator, Network::Stokenet, 1);
        let plan = fill_keeper_plan(&KeeperSettings::new(Decimal::from_int(10), validator).unwrap()).unwrap();
        assert_eq!(plan.step_ids(), vec!["fill_validator_staking", "set_oracle_prices"]);
        assert!(plan.external_inputs().contains(&KEEPER_COMPONENT.to_string()));
    }
}
