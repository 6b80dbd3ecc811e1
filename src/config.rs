//! Configuración central de la aplicación.
//! Se lee de variables de entorno (con `.env` cargado una sola vez) y nunca
//! entra en pánico: cada valor ausente o inválido es un `ProvisionError::Config`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use provision_core::PollPolicy;
use provision_gateway::Account;
use provision_manifest::{Address, Decimal};
use provision_persistence::{init_dotenv, StoreConfig};
use provision_toolchain::{CommandLine, ToolchainConfig};

use crate::errors::ProvisionError;
use crate::funding::FundingPolicy;
use crate::phases::Phase;

/// Clave pública del oráculo de precios instalada al instanciarlo.
pub const DEFAULT_ORACLE_PUBLIC_KEY: &str = "a5bc3d9296bda1e52f96bf0a65238998877dbddb0703bd37ef1f18a6ffce458a";

/// Clave privada en hex; `Debug` no la muestra.
#[derive(Clone)]
struct SecretHex(String);

impl std::fmt::Debug for SecretHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretHex(..)")
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub gateway_url: String,
    account_private_key: SecretHex,
    pub account_address: String,
    pub store: StoreConfig,
    pub components_root: PathBuf,
    /// Sobrescriben los umbrales por fase.
    pub funding_threshold: Option<Decimal>,
    pub funding_target: Option<Decimal>,
    pub funding_poll: Duration,
    pub status_poll: Duration,
    pub status_timeout: Option<Duration>,
    /// Sobrescribe el fee por fase.
    pub fee_lock: Option<Decimal>,
    pub oracle_public_key: String,
    pub validator_address: Option<String>,
    pub build_command: CommandLine,
    /// `CLEAN_COMMAND=""` desactiva la limpieza.
    pub clean_command: Option<CommandLine>,
}

impl ProvisionConfig {
    pub fn from_env() -> Result<Self, ProvisionError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProvisionError> {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty())
                       .ok_or_else(|| ProvisionError::Config(format!("{key} no está definido")))
        };
        let store = StoreConfig::from_lookup(&lookup);
        let clean_command = match lookup("CLEAN_COMMAND") {
            Some(line) if line.trim().is_empty() => None,
            Some(line) => Some(CommandLine::parse(&line, "clean")?),
            None => Some(CommandLine::new("cargo", &["clean"])),
        };
        let build_command = match lookup("BUILD_COMMAND") {
            Some(line) => CommandLine::parse(&line, "build")?,
            None => CommandLine::new("scrypto", &["build"]),
        };

        Ok(Self { gateway_url: required("GATEWAY_URL")?,
                  account_private_key: SecretHex(required("ACCOUNT_PRIVATE_KEY")?),
                  account_address: required("ACCOUNT_ADDRESS")?,
                  store,
                  components_root: lookup("COMPONENTS_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
                  funding_threshold: parse_opt(&lookup, "FUNDING_THRESHOLD")?,
                  funding_target: parse_opt(&lookup, "FUNDING_TARGET")?,
                  funding_poll: secs(&lookup, "FUNDING_POLL_SECS")?.unwrap_or(Duration::from_secs(5)),
                  status_poll: secs(&lookup, "STATUS_POLL_SECS")?.unwrap_or(Duration::from_secs(2)),
                  status_timeout: secs(&lookup, "STATUS_TIMEOUT_SECS")?,
                  fee_lock: parse_opt(&lookup, "FEE_LOCK")?,
                  oracle_public_key: lookup("ORACLE_PUBLIC_KEY").unwrap_or_else(|| DEFAULT_ORACLE_PUBLIC_KEY.to_string()),
                  validator_address: lookup("VALIDATOR_ADDRESS").filter(|v| !v.trim().is_empty()),
                  build_command,
                  clean_command })
    }

    pub fn load_account(&self) -> Result<Account, ProvisionError> {
        let address = Address::parse(&self.account_address)?;
        Ok(Account::from_hex(&self.account_private_key.0, address)?)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let policy = PollPolicy::unbounded(self.status_poll);
        match self.status_timeout {
            Some(timeout) => policy.with_timeout(timeout),
            None => policy,
        }
    }

    /// Umbrales de la fase con los overrides del entorno aplicados.
    pub fn funding_policy(&self, phase: Phase) -> FundingPolicy {
        let (threshold, target) = phase.funding();
        FundingPolicy::new(self.funding_threshold.unwrap_or(threshold)).with_target(self.funding_target.unwrap_or(target))
                                                                        .with_poll_interval(self.funding_poll)
    }

    pub fn fee(&self, phase: Phase) -> Decimal {
        self.fee_lock.unwrap_or_else(|| phase.default_fee())
    }

    pub fn toolchain(&self) -> ToolchainConfig {
        ToolchainConfig::new(&self.components_root).with_build(self.build_command.clone())
                                                   .with_clean(self.clean_command.clone())
    }
}

fn parse_opt(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Decimal>, ProvisionError> {
    lookup(key).map(|raw| {
                   raw.trim()
                      .parse::<Decimal>()
                      .map_err(|_| ProvisionError::Config(format!("{key}={raw} no es un decimal")))
               })
               .transpose()
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>, ProvisionError> {
    lookup(key).map(|raw| {
                   raw.trim()
                      .parse::<u64>()
                      .map(Duration::from_secs)
                      .map_err(|_| ProvisionError::Config(format!("{key}={raw} no es un número de segundos")))
               })
               .transpose()
}
