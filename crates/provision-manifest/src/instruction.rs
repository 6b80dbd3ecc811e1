//! Instrucciones de ledger con operandos tipados.
//!
//! En el cable cada instrucción es `Enum<opcode>(operandos...)`; los
//! operandos compuestos (roles, metadata, esquemas) usan su propia
//! codificación de `roles` y `metadata`.

use crate::error::ManifestError;
use crate::metadata::{MetadataConfig, MetadataValue, NonFungibleIdType, NonFungibleSchema};
use crate::roles::{FungibleResourceRoles, NonFungibleResourceRoles, OwnerRole};
use crate::value::{expect_fields, Address, BlobRef, Decimal, Expression, FromManifestValue, ManifestValue, ToManifestValue};

/// Parámetros de creación de un recurso fungible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FungibleResourceDefinition {
    pub owner_role: OwnerRole,
    pub track_total_supply: bool,
    pub divisibility: u8,
    /// `None` crea el recurso sin suministro inicial.
    pub initial_supply: Option<Decimal>,
    pub roles: FungibleResourceRoles,
    pub metadata: MetadataConfig,
}

/// Parámetros de creación de un recurso no fungible (sin suministro inicial).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFungibleResourceDefinition {
    pub owner_role: OwnerRole,
    pub id_type: NonFungibleIdType,
    pub track_total_supply: bool,
    pub schema: NonFungibleSchema,
    pub roles: NonFungibleResourceRoles,
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    LockFee { account: Address, amount: Decimal },
    CreateProofOfAmount { account: Address, resource: Address, amount: Decimal },
    CallMethod { address: Address, method: String, args: Vec<ManifestValue> },
    CallFunction { package: Address, blueprint: String, function: String, args: Vec<ManifestValue> },
    CreateFungibleResource(FungibleResourceDefinition),
    CreateNonFungibleResource(NonFungibleResourceDefinition),
    Withdraw { account: Address, resource: Address, amount: Decimal },
    TakeFromWorktop { resource: Address, amount: Decimal, bucket: String },
    DepositAll { account: Address },
    SetMetadata { entity: Address, key: String, value: MetadataValue },
    PublishPackage { code: BlobRef, definition: BlobRef, owner_role: OwnerRole, metadata: MetadataConfig },
}

impl Instruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::LockFee { .. } => 0,
            Instruction::CreateProofOfAmount { .. } => 1,
            Instruction::CallMethod { .. } => 2,
            Instruction::CallFunction { .. } => 3,
            Instruction::CreateFungibleResource(_) => 4,
            Instruction::CreateNonFungibleResource(_) => 5,
            Instruction::Withdraw { .. } => 6,
            Instruction::TakeFromWorktop { .. } => 7,
            Instruction::DepositAll { .. } => 8,
            Instruction::SetMetadata { .. } => 9,
            Instruction::PublishPackage { .. } => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instruction::LockFee { .. } => "LOCK_FEE",
            Instruction::CreateProofOfAmount { .. } => "CREATE_PROOF_OF_AMOUNT",
            Instruction::CallMethod { .. } => "CALL_METHOD",
            Instruction::CallFunction { .. } => "CALL_FUNCTION",
            Instruction::CreateFungibleResource(_) => "CREATE_FUNGIBLE_RESOURCE",
            Instruction::CreateNonFungibleResource(_) => "CREATE_NON_FUNGIBLE_RESOURCE",
            Instruction::Withdraw { .. } => "WITHDRAW",
            Instruction::TakeFromWorktop { .. } => "TAKE_FROM_WORKTOP",
            Instruction::DepositAll { .. } => "DEPOSIT_ALL",
            Instruction::SetMetadata { .. } => "SET_METADATA",
            Instruction::PublishPackage { .. } => "PUBLISH_PACKAGE",
        }
    }

    /// Operandos en orden de cable.
    pub fn operands(&self) -> Vec<ManifestValue> {
        use ManifestValue as V;
        match self {
            Instruction::LockFee { account, amount } => vec![V::Address(account.clone()), V::Decimal(*amount)],
            Instruction::CreateProofOfAmount { account, resource, amount } => {
                vec![V::Address(account.clone()), V::Address(resource.clone()), V::Decimal(*amount)]
            }
            Instruction::CallMethod { address, method, args } => {
                vec![V::Address(address.clone()), V::String(method.clone()), V::Tuple(args.clone())]
            }
            Instruction::CallFunction { package,
                                        blueprint,
                                        function,
                                        args, } => vec![V::Address(package.clone()),
                                                        V::String(blueprint.clone()),
                                                        V::String(function.clone()),
                                                        V::Tuple(args.clone())],
            Instruction::CreateFungibleResource(def) => vec![def.owner_role.to_value(),
                                                             V::Bool(def.track_total_supply),
                                                             V::U8(def.divisibility),
                                                             V::option(def.initial_supply.map(V::Decimal)),
                                                             def.roles.to_value(),
                                                             def.metadata.to_value(),
                                                             V::option(None)],
            Instruction::CreateNonFungibleResource(def) => vec![def.owner_role.to_value(),
                                                                def.id_type.to_value(),
                                                                V::Bool(def.track_total_supply),
                                                                def.schema.to_value(),
                                                                def.roles.to_value(),
                                                                def.metadata.to_value(),
                                                                V::option(None)],
            Instruction::Withdraw { account, resource, amount } => {
                vec![V::Address(account.clone()), V::Address(resource.clone()), V::Decimal(*amount)]
            }
            Instruction::TakeFromWorktop { resource, amount, bucket } => {
                vec![V::Address(resource.clone()), V::Decimal(*amount), V::Bucket(bucket.clone())]
            }
            Instruction::DepositAll { account } => vec![V::Address(account.clone()), V::Expression(Expression::EntireWorktop)],
            Instruction::SetMetadata { entity, key, value } => vec![V::Address(entity.clone()), V::String(key.clone()), value.to_value()],
            Instruction::PublishPackage { code,
                                          definition,
                                          owner_role,
                                          metadata, } => vec![V::Blob(*code), V::Blob(*definition), owner_role.to_value(), metadata.to_value()],
        }
    }
}

impl ToManifestValue for Instruction {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::enum_of(self.opcode(), self.operands())
    }
}

fn string_of(value: &ManifestValue) -> Result<String, ManifestError> {
    value.as_string().map(str::to_string)
}

fn address_of(value: &ManifestValue) -> Result<Address, ManifestError> {
    value.as_address().cloned()
}

impl FromManifestValue for Instruction {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let (opcode, fields) = value.as_enum()?;
        Ok(match opcode {
            0 => {
                let f = expect_fields("LockFee", fields, 2)?;
                Instruction::LockFee { account: address_of(&f[0])?,
                                       amount: f[1].as_decimal()? }
            }
            1 => {
                let f = expect_fields("CreateProofOfAmount", fields, 3)?;
                Instruction::CreateProofOfAmount { account: address_of(&f[0])?,
                                                   resource: address_of(&f[1])?,
                                                   amount: f[2].as_decimal()? }
            }
            2 => {
                let f = expect_fields("CallMethod", fields, 3)?;
                Instruction::CallMethod { address: address_of(&f[0])?,
                                          method: string_of(&f[1])?,
                                          args: f[2].as_tuple()?.to_vec() }
            }
            3 => {
                let f = expect_fields("CallFunction", fields, 4)?;
                Instruction::CallFunction { package: address_of(&f[0])?,
                                            blueprint: string_of(&f[1])?,
                                            function: string_of(&f[2])?,
                                            args: f[3].as_tuple()?.to_vec() }
            }
            4 => {
                let f = expect_fields("CreateFungibleResource", fields, 7)?;
                let initial_supply = f[3].as_option()?.map(|v| v.as_decimal()).transpose()?;
                Instruction::CreateFungibleResource(FungibleResourceDefinition { owner_role: OwnerRole::from_value(&f[0])?,
                                                                                 track_total_supply: f[1].as_bool()?,
                                                                                 divisibility: f[2].as_u8()?,
                                                                                 initial_supply,
                                                                                 roles: FungibleResourceRoles::from_value(&f[4])?,
                                                                                 metadata: MetadataConfig::from_value(&f[5])? })
            }
            5 => {
                let f = expect_fields("CreateNonFungibleResource", fields, 7)?;
                Instruction::CreateNonFungibleResource(NonFungibleResourceDefinition { owner_role: OwnerRole::from_value(&f[0])?,
                                                                                       id_type: NonFungibleIdType::from_value(&f[1])?,
                                                                                       track_total_supply: f[2].as_bool()?,
                                                                                       schema: NonFungibleSchema::from_value(&f[3])?,
                                                                                       roles: NonFungibleResourceRoles::from_value(&f[4])?,
                                                                                       metadata: MetadataConfig::from_value(&f[5])? })
            }
            6 => {
                let f = expect_fields("Withdraw", fields, 3)?;
                Instruction::Withdraw { account: address_of(&f[0])?,
                                        resource: address_of(&f[1])?,
                                        amount: f[2].as_decimal()? }
            }
            7 => {
                let f = expect_fields("TakeFromWorktop", fields, 3)?;
                Instruction::TakeFromWorktop { resource: address_of(&f[0])?,
                                               amount: f[1].as_decimal()?,
                                               bucket: f[2].as_bucket()?.to_string() }
            }
            8 => {
                let f = expect_fields("DepositAll", fields, 2)?;
                f[1].as_expression()?;
                Instruction::DepositAll { account: address_of(&f[0])? }
            }
            9 => {
                let f = expect_fields("SetMetadata", fields, 3)?;
                Instruction::SetMetadata { entity: address_of(&f[0])?,
                                           key: string_of(&f[1])?,
                                           value: MetadataValue::from_value(&f[2])? }
            }
            10 => {
                let f = expect_fields("PublishPackage", fields, 4)?;
                Instruction::PublishPackage { code: f[0].as_blob()?,
                                              definition: f[1].as_blob()?,
                                              owner_role: OwnerRole::from_value(&f[2])?,
                                              metadata: MetadataConfig::from_value(&f[3])? }
            }
            d => return Err(ManifestError::UnknownDiscriminator { type_name: "Instruction", discriminator: d }),
        })
    }
}

/// Manifiesto: lista ordenada de instrucciones más los blobs que referencian.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub instructions: Vec<Instruction>,
    pub blobs: Vec<Vec<u8>>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Hash blake3 (hex) de la codificación binaria del manifiesto.
    pub fn hash(&self) -> Result<String, ManifestError> {
        Ok(blake3::hash(&crate::codec::encode_manifest(self)?).to_hex().to_string())
    }
}
