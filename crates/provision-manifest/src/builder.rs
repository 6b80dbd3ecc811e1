//! Builder inmutable de manifiestos.
//!
//! Cada método recibe `&self` y devuelve un builder nuevo con las
//! instrucciones agregadas al final; el builder original no cambia. Construir
//! no tiene efectos: nada llega al ledger hasta que el manifiesto se envía por
//! el gateway.

use crate::instruction::{FungibleResourceDefinition, Instruction, Manifest, NonFungibleResourceDefinition};
use crate::metadata::{MetadataConfig, MetadataValue};
use crate::roles::OwnerRole;
use crate::value::{Address, BlobRef, Decimal, ManifestValue};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestBuilder {
    instructions: Vec<Instruction>,
    blobs: Vec<Vec<u8>>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combinador base: lista actual + una instrucción.
    pub fn append(&self, instruction: Instruction) -> Self {
        let mut next = self.clone();
        next.instructions.push(instruction);
        next
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn lock_fee(&self, account: &Address, amount: Decimal) -> Self {
        self.append(Instruction::LockFee { account: account.clone(),
                                           amount })
    }

    pub fn create_proof_of_amount(&self, account: &Address, resource: &Address, amount: Decimal) -> Self {
        self.append(Instruction::CreateProofOfAmount { account: account.clone(),
                                                       resource: resource.clone(),
                                                       amount })
    }

    pub fn withdraw(&self, account: &Address, resource: &Address, amount: Decimal) -> Self {
        self.append(Instruction::Withdraw { account: account.clone(),
                                            resource: resource.clone(),
                                            amount })
    }

    pub fn take_from_worktop(&self, resource: &Address, amount: Decimal, bucket: &str) -> Self {
        self.append(Instruction::TakeFromWorktop { resource: resource.clone(),
                                                   amount,
                                                   bucket: bucket.to_string() })
    }

    /// Retira de la cuenta y deja el monto en un bucket con nombre.
    pub fn withdraw_to_bucket(&self, account: &Address, resource: &Address, amount: Decimal, bucket: &str) -> Self {
        self.withdraw(account, resource, amount)
            .take_from_worktop(resource, amount, bucket)
    }

    /// Deposita todo lo que queda en el worktop.
    pub fn deposit_all(&self, account: &Address) -> Self {
        self.append(Instruction::DepositAll { account: account.clone() })
    }

    pub fn call_method(&self, address: &Address, method: &str, args: Vec<ManifestValue>) -> Self {
        self.append(Instruction::CallMethod { address: address.clone(),
                                              method: method.to_string(),
                                              args })
    }

    pub fn call_function(&self, package: &Address, blueprint: &str, function: &str, args: Vec<ManifestValue>) -> Self {
        self.append(Instruction::CallFunction { package: package.clone(),
                                                blueprint: blueprint.to_string(),
                                                function: function.to_string(),
                                                args })
    }

    pub fn create_fungible_resource(&self, definition: FungibleResourceDefinition) -> Self {
        self.append(Instruction::CreateFungibleResource(definition))
    }

    pub fn create_non_fungible_resource(&self, definition: NonFungibleResourceDefinition) -> Self {
        self.append(Instruction::CreateNonFungibleResource(definition))
    }

    pub fn set_metadata(&self, entity: &Address, key: &str, value: MetadataValue) -> Self {
        self.append(Instruction::SetMetadata { entity: entity.clone(),
                                               key: key.to_string(),
                                               value })
    }

    /// Adjunta código y definición como blobs y publica el paquete.
    pub fn publish_package(&self, code: Vec<u8>, definition: Vec<u8>, owner_role: OwnerRole, metadata: MetadataConfig) -> Self {
        let instruction = Instruction::PublishPackage { code: BlobRef::of(&code),
                                                        definition: BlobRef::of(&definition),
                                                        owner_role,
                                                        metadata };
        let mut next = self.append(instruction);
        next.blobs.push(code);
        next.blobs.push(definition);
        next
    }

    pub fn build(&self) -> Manifest {
        Manifest { instructions: self.instructions.clone(),
                   blobs: self.blobs.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Address {
        Address::parse("account_tdx_2_1qqqqqq").unwrap()
    }

    #[test]
    fn earlier_builders_are_never_mutated() {
        let base = ManifestBuilder::new().lock_fee(&account(), "100".parse().unwrap());
        let with_deposit = base.deposit_all(&account());
        let other_branch = base.call_method(&account(), "noop", vec![]);
        assert_eq!(base.instructions().len(), 1);
        assert_eq!(with_deposit.instructions().len(), 2);
        assert_eq!(other_branch.instructions().len(), 2);
        assert_ne!(with_deposit.build(), other_branch.build());
    }

    #[test]
    fn withdraw_to_bucket_appends_withdraw_then_take() {
        let xrd = Address::parse("resource_tdx_2_1tknxxx").unwrap();
        let m = ManifestBuilder::new().withdraw_to_bucket(&account(), &xrd, "5".parse().unwrap(), "bucket1")
                                      .build();
        assert!(matches!(m.instructions[0], Instruction::Withdraw { .. }));
        assert!(matches!(&m.instructions[1], Instruction::TakeFromWorktop { bucket, .. } if bucket == "bucket1"));
    }

    #[test]
    fn non_fungible_resource_renders_with_its_schema() {
        use crate::metadata::{FieldKind, NonFungibleIdType, NonFungibleSchema};
        use crate::render::render_manifest;
        use crate::roles::{AccessRule, NonFungibleResourceRoles, RoleAssignment};

        let badge = Address::parse("resource_tdx_2_1tknxxx").unwrap();
        let definition = NonFungibleResourceDefinition { owner_role: OwnerRole::None,
                                                         id_type: NonFungibleIdType::Integer,
                                                         track_total_supply: false,
                                                         schema: NonFungibleSchema { type_name: "KeeperTicket".into(),
                                                                                     fields: vec![("epoch".into(), FieldKind::U64)],
                                                                                     mutable_fields: vec![] },
                                                         roles: NonFungibleResourceRoles { mint: Some(RoleAssignment::locked(AccessRule::require(badge))),
                                                                                           ..Default::default() },
                                                         metadata: MetadataConfig::new() };
        let m = ManifestBuilder::new().lock_fee(&account(), "10".parse().unwrap())
                                      .create_non_fungible_resource(definition.clone())
                                      .build();
        assert_eq!(m.instructions[1], Instruction::CreateNonFungibleResource(definition));
        let rendered = render_manifest(&m);
        let line = rendered.lines().nth(1).unwrap();
        assert!(line.starts_with("CREATE_NON_FUNGIBLE_RESOURCE "), "{line}");
        assert!(line.ends_with(';'));
        assert!(line.contains("\"KeeperTicket\""), "{line}");
        assert!(line.contains("resource_tdx_2_1tknxxx"), "{line}");
    }

    #[test]
    fn publish_package_attaches_blobs_referenced_by_hash() {
        let m = ManifestBuilder::new().publish_package(vec![0, 97, 115, 109], vec![1, 2, 3], OwnerRole::None, MetadataConfig::new())
                                      .build();
        assert_eq!(m.blobs.len(), 2);
        match &m.instructions[0] {
            Instruction::PublishPackage { code, definition, .. } => {
                assert_eq!(*code, BlobRef::of(&m.blobs[0]));
                assert_eq!(*definition, BlobRef::of(&m.blobs[1]));
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }
}
