//! Claves del checkpoint. Los nombres son el contrato con el archivo editable a mano.

pub const OWNER_RESOURCE: &str = "OWNER_RESOURCE";
pub const AUTHORITY_RESOURCE: &str = "AUTHORITY_RESOURCE";
pub const BASE_AUTHORITY_RESOURCE: &str = "BASE_AUTHORITY_RESOURCE";
pub const BASE_RESOURCE: &str = "BASE_RESOURCE";

pub const FAUCET_PACKAGE: &str = "FAUCET_PACKAGE";
pub const FAUCET_COMPONENT: &str = "FAUCET_COMPONENT";
pub const FAUCET_OWNER_RESOURCE: &str = "FAUCET_OWNER_RESOURCE";
pub const USDC_RESOURCE: &str = "USDC_RESOURCE";
pub const USDT_RESOURCE: &str = "USDT_RESOURCE";

pub const KEEPER_PACKAGE: &str = "KEEPER_PACKAGE";
pub const KEEPER_COMPONENT: &str = "KEEPER_COMPONENT";
pub const INTEREST_PACKAGE: &str = "INTEREST_PACKAGE";
pub const INTEREST_COMPONENT: &str = "INTEREST_COMPONENT";
pub const ORACLE_PACKAGE: &str = "ORACLE_PACKAGE";
pub const ORACLE_COMPONENT: &str = "ORACLE_COMPONENT";

pub const DAPP_DEFINITION_TX: &str = "DAPP_DEFINITION_TX";
pub const KEEPER_STAKING_TX: &str = "KEEPER_STAKING_TX";
pub const ORACLE_PRICES_TX: &str = "ORACLE_PRICES_TX";
pub const SMOKE_FAUCET_TX: &str = "SMOKE_FAUCET_TX";
pub const SMOKE_BUCKET_TX: &str = "SMOKE_BUCKET_TX";
