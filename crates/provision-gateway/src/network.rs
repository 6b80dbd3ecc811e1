//! Catálogo de redes soportadas y configuración de red informada por el gateway.
//!
//! Una red que no esté en el catálogo es un error fatal: nunca se asumen
//! valores por defecto.

use provision_manifest::Address;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Stokenet,
}

impl Network {
    pub fn from_name(name: &str) -> Result<Self, GatewayError> {
        match name {
            "mainnet" => Ok(Network::Mainnet),
            "stokenet" => Ok(Network::Stokenet),
            other => Err(GatewayError::UnknownNetwork(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Stokenet => "stokenet",
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Network::Mainnet => 0x01,
            Network::Stokenet => 0x02,
        }
    }

    /// Sufijo del HRP de las direcciones de esta red.
    pub fn hrp_suffix(&self) -> &'static str {
        match self {
            Network::Mainnet => "rdx",
            Network::Stokenet => "tdx_2_",
        }
    }

    /// Redes de prueba: tienen faucet de autoservicio.
    pub fn is_test(&self) -> bool {
        matches!(self, Network::Stokenet)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Direcciones de sistema bien conocidas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownAddresses {
    /// Recurso nativo (balances y fees).
    pub xrd: Address,
    /// Componente faucet, sólo en redes de prueba.
    pub faucet: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub network_id: u8,
    pub network_name: String,
    pub network: Network,
    pub well_known: WellKnownAddresses,
}

impl NetworkConfiguration {
    /// Valida id y nombre reportados contra el catálogo.
    pub fn resolve(network_id: u8, network_name: &str, well_known: WellKnownAddresses) -> Result<Self, GatewayError> {
        let network = Network::from_name(network_name)?;
        if network.id() != network_id {
            return Err(GatewayError::UnknownNetwork(format!("{network_name} (id {network_id})")));
        }
        Ok(Self { network_id,
                  network_name: network_name.to_string(),
                  network,
                  well_known })
    }

    pub fn is_test_network(&self) -> bool {
        self.network.is_test()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_known() -> WellKnownAddresses {
        WellKnownAddresses { xrd: Address::parse("resource_tdx_2_1tknxxx").unwrap(),
                             faucet: None }
    }

    #[test]
    fn unknown_network_is_fatal() {
        assert_eq!(Network::from_name("localnet"), Err(GatewayError::UnknownNetwork("localnet".into())));
        assert!(NetworkConfiguration::resolve(0xf2, "localnet", well_known()).is_err());
    }

    #[test]
    fn id_must_match_catalog() {
        assert!(NetworkConfiguration::resolve(2, "stokenet", well_known()).is_ok());
        assert!(NetworkConfiguration::resolve(1, "stokenet", well_known()).is_err());
    }
}
