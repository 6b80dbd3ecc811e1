use provision_core::{classify_error, CoreEngineError, ErrorClass};
use provision_gateway::GatewayError;
use provision_manifest::ManifestError;
use provision_persistence::PersistenceError;
use provision_toolchain::BuildError;
use thiserror::Error;

/// Errores de la aplicación: une los de cada crate.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error del motor: {0}")]
    Core(#[from] CoreEngineError),
    #[error("Error del gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Error de compilación: {0}")]
    Build(#[from] BuildError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Manifiesto inválido: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Saldo insuficiente tras {polls} consultas: {balance} < {target}")]
    FundingTimeout { polls: u32, balance: String, target: String },
}

/// Códigos de salida del binario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Usage = 2,
    Configuration = 3,
    Build = 4,
    Transaction = 5,
}

impl ProvisionError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ProvisionError::Config(_) | ProvisionError::Manifest(_) => ExitCode::Configuration,
            ProvisionError::Build(_) => ExitCode::Build,
            ProvisionError::Gateway(GatewayError::UnknownNetwork(_))
            | ProvisionError::Gateway(GatewayError::InvalidKey(_))
            | ProvisionError::Gateway(GatewayError::AccountNetworkMismatch { .. }) => ExitCode::Configuration,
            ProvisionError::Gateway(_) | ProvisionError::FundingTimeout { .. } | ProvisionError::Persistence(_) => ExitCode::Transaction,
            ProvisionError::Core(err) => match classify_error(err) {
                ErrorClass::Configuration => ExitCode::Configuration,
                ErrorClass::Build => ExitCode::Build,
                ErrorClass::Transaction | ErrorClass::Storage | ErrorClass::Internal => ExitCode::Transaction,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_variant_format() {
        let err = ProvisionError::Config("GATEWAY_URL vacío".into());
        assert_eq!(err.to_string(), "Error de configuración: GATEWAY_URL vacío");
        assert_eq!(err.exit_code(), ExitCode::Configuration);
    }

    #[test]
    fn core_errors_map_through_their_class() {
        let missing: ProvisionError = CoreEngineError::MissingInput { step: "keeper_staking".into(),
                                                                      key: "KEEPER_COMPONENT".into() }.into();
        assert_eq!(missing.exit_code(), ExitCode::Configuration);
        let build: ProvisionError = CoreEngineError::Build("oracle".into()).into();
        assert_eq!(build.exit_code(), ExitCode::Build);
        let failed: ProvisionError = CoreEngineError::TransactionFailed { step: "owner".into(),
                                                                          intent: "txid_00".into(),
                                                                          reason: "rejected".into() }.into();
        assert_eq!(failed.exit_code() as i32, 5);
    }
}
