//! Cuenta operadora: par de claves ed25519 más su dirección en el ledger.
//!
//! Se carga una vez al inicio del proceso y no rota durante la corrida.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use provision_manifest::{Address, EntityKind};

use crate::error::GatewayError;
use crate::network::NetworkConfiguration;

#[derive(Clone)]
pub struct Account {
    signing_key: SigningKey,
    address: Address,
}

impl Account {
    pub fn new(signing_key: SigningKey, address: Address) -> Result<Self, GatewayError> {
        if address.entity_kind() != EntityKind::Account {
            return Err(GatewayError::InvalidKey(format!("{address} is not an account address")));
        }
        Ok(Self { signing_key, address })
    }

    /// Clave privada en hex (32 bytes).
    pub fn from_hex(private_key_hex: &str, address: Address) -> Result<Self, GatewayError> {
        let raw = hex::decode(private_key_hex.trim()).map_err(|e| GatewayError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = raw.as_slice()
                                 .try_into()
                                 .map_err(|_| GatewayError::InvalidKey(format!("expected 32 bytes, got {}", raw.len())))?;
        Self::new(SigningKey::from_bytes(&bytes), address)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key().as_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// La dirección debe pertenecer a la red a la que apunta el gateway.
    pub fn check_network(&self, config: &NetworkConfiguration) -> Result<(), GatewayError> {
        if self.address.network_suffix() != config.network.hrp_suffix() {
            return Err(GatewayError::AccountNetworkMismatch { address: self.address.to_string(),
                                                              network: config.network_name.clone() });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
         .field("address", &self.address)
         .field("public_key", &self.public_key_hex())
         .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, WellKnownAddresses};

    fn config(network: Network) -> NetworkConfiguration {
        let xrd = format!("resource_{}1tknxxx", network.hrp_suffix());
        NetworkConfiguration::resolve(network.id(),
                                      network.name(),
                                      WellKnownAddresses { xrd: Address::parse(&xrd).unwrap(),
                                                           faucet: None })
        .unwrap()
    }

    #[test]
    fn loads_key_from_hex_and_hides_it_in_debug() {
        let account = Account::from_hex(&"07".repeat(32), Address::parse("account_tdx_2_1qqqqqq").unwrap()).unwrap();
        let debug = format!("{account:?}");
        assert!(debug.contains("account_tdx_2_1qqqqqq"));
        assert!(!debug.contains(&"07".repeat(32)));
    }

    #[test]
    fn rejects_short_key_and_non_account_address() {
        assert!(Account::from_hex("abcd", Address::parse("account_tdx_2_1qqqqqq").unwrap()).is_err());
        assert!(Account::from_hex(&"07".repeat(32), Address::parse("resource_tdx_2_1qqqqqq").unwrap()).is_err());
    }

    #[test]
    fn account_must_match_network_hrp() {
        let account = Account::from_hex(&"07".repeat(32), Address::parse("account_tdx_2_1qqqqqq").unwrap()).unwrap();
        assert!(account.check_network(&config(Network::Stokenet)).is_ok());
        assert!(matches!(account.check_network(&config(Network::Mainnet)),
                         Err(GatewayError::AccountNetworkMismatch { .. })));
    }
}
