//! Reglas de acceso y configuración de roles.
//!
//! Cada tipo se codifica como `Enum<n>` anidados con los índices exactos que
//! espera el ledger:
//!
//! | tipo | variantes |
//! |---|---|
//! | `OwnerRole` | None=0, Fixed=1, Updatable=2 |
//! | `AccessRule` | AllowAll=0, DenyAll=1, Protected=2 |
//! | `AccessRuleNode` | ProofRule=0, AnyOf=1, AllOf=2 |
//! | `ProofRule` | Require=0, AmountOf=1, CountOf=2, AllOf=3, AnyOf=4 |
//! | `ResourceOrNonFungible` | NonFungible=0, Resource=1 |

use crate::error::ManifestError;
use crate::value::{expect_fields, Address, Decimal, FromManifestValue, ManifestValue, ToManifestValue, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOrNonFungible {
    NonFungible { resource: Address, local_id: String },
    Resource(Address),
}

impl ToManifestValue for ResourceOrNonFungible {
    fn to_value(&self) -> ManifestValue {
        match self {
            ResourceOrNonFungible::NonFungible { resource, local_id } => {
                ManifestValue::enum_of(0,
                                       vec![ManifestValue::Tuple(vec![ManifestValue::Address(resource.clone()),
                                                                      ManifestValue::string(local_id.clone())])])
            }
            ResourceOrNonFungible::Resource(address) => ManifestValue::enum_of(1, vec![ManifestValue::Address(address.clone())]),
        }
    }
}

impl FromManifestValue for ResourceOrNonFungible {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        match value.as_enum()? {
            (0, fields) => {
                let id = expect_fields("NonFungibleGlobalId", expect_fields("ResourceOrNonFungible::NonFungible", fields, 1)?[0].as_tuple()?, 2)?;
                Ok(ResourceOrNonFungible::NonFungible { resource: id[0].as_address()?.clone(),
                                                        local_id: id[1].as_string()?.to_string() })
            }
            (1, fields) => {
                let f = expect_fields("ResourceOrNonFungible::Resource", fields, 1)?;
                Ok(ResourceOrNonFungible::Resource(f[0].as_address()?.clone()))
            }
            (d, _) => Err(ManifestError::UnknownDiscriminator { type_name: "ResourceOrNonFungible",
                                                                discriminator: d }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofRule {
    Require(ResourceOrNonFungible),
    AmountOf(Decimal, Address),
    CountOf(u8, Vec<ResourceOrNonFungible>),
    AllOf(Vec<ResourceOrNonFungible>),
    AnyOf(Vec<ResourceOrNonFungible>),
}

fn resources_value(items: &[ResourceOrNonFungible]) -> ManifestValue {
    ManifestValue::array(ValueKind::Enum, items.iter().map(ToManifestValue::to_value).collect())
}

fn resources_from(value: &ManifestValue) -> Result<Vec<ResourceOrNonFungible>, ManifestError> {
    value.as_array()?.iter().map(ResourceOrNonFungible::from_value).collect()
}

impl ToManifestValue for ProofRule {
    fn to_value(&self) -> ManifestValue {
        match self {
            ProofRule::Require(r) => ManifestValue::enum_of(0, vec![r.to_value()]),
            ProofRule::AmountOf(amount, resource) => {
                ManifestValue::enum_of(1, vec![ManifestValue::Decimal(*amount), ManifestValue::Address(resource.clone())])
            }
            ProofRule::CountOf(n, items) => ManifestValue::enum_of(2, vec![ManifestValue::U8(*n), resources_value(items)]),
            ProofRule::AllOf(items) => ManifestValue::enum_of(3, vec![resources_value(items)]),
            ProofRule::AnyOf(items) => ManifestValue::enum_of(4, vec![resources_value(items)]),
        }
    }
}

impl FromManifestValue for ProofRule {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let (d, fields) = value.as_enum()?;
        match d {
            0 => Ok(ProofRule::Require(ResourceOrNonFungible::from_value(&expect_fields("ProofRule::Require", fields, 1)?[0])?)),
            1 => {
                let f = expect_fields("ProofRule::AmountOf", fields, 2)?;
                Ok(ProofRule::AmountOf(f[0].as_decimal()?, f[1].as_address()?.clone()))
            }
            2 => {
                let f = expect_fields("ProofRule::CountOf", fields, 2)?;
                Ok(ProofRule::CountOf(f[0].as_u8()?, resources_from(&f[1])?))
            }
            3 => Ok(ProofRule::AllOf(resources_from(&expect_fields("ProofRule::AllOf", fields, 1)?[0])?)),
            4 => Ok(ProofRule::AnyOf(resources_from(&expect_fields("ProofRule::AnyOf", fields, 1)?[0])?)),
            d => Err(ManifestError::UnknownDiscriminator { type_name: "ProofRule", discriminator: d }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRuleNode {
    ProofRule(ProofRule),
    AnyOf(Vec<AccessRuleNode>),
    AllOf(Vec<AccessRuleNode>),
}

impl ToManifestValue for AccessRuleNode {
    fn to_value(&self) -> ManifestValue {
        let nodes = |items: &[AccessRuleNode]| ManifestValue::array(ValueKind::Enum, items.iter().map(|n| n.to_value()).collect());
        match self {
            AccessRuleNode::ProofRule(rule) => ManifestValue::enum_of(0, vec![rule.to_value()]),
            AccessRuleNode::AnyOf(items) => ManifestValue::enum_of(1, vec![nodes(items)]),
            AccessRuleNode::AllOf(items) => ManifestValue::enum_of(2, vec![nodes(items)]),
        }
    }
}

impl FromManifestValue for AccessRuleNode {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let nodes = |v: &ManifestValue| -> Result<Vec<AccessRuleNode>, ManifestError> {
            v.as_array()?.iter().map(AccessRuleNode::from_value).collect()
        };
        let (d, fields) = value.as_enum()?;
        let f = expect_fields("AccessRuleNode", fields, 1)?;
        match d {
            0 => Ok(AccessRuleNode::ProofRule(ProofRule::from_value(&f[0])?)),
            1 => Ok(AccessRuleNode::AnyOf(nodes(&f[0])?)),
            2 => Ok(AccessRuleNode::AllOf(nodes(&f[0])?)),
            d => Err(ManifestError::UnknownDiscriminator { type_name: "AccessRuleNode", discriminator: d }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    AllowAll,
    DenyAll,
    Protected(AccessRuleNode),
}

impl AccessRule {
    /// "requiere prueba del recurso R".
    pub fn require(resource: Address) -> Self {
        AccessRule::Protected(AccessRuleNode::ProofRule(ProofRule::Require(ResourceOrNonFungible::Resource(resource))))
    }

    /// "requiere prueba de al menos `amount` unidades de R".
    pub fn require_amount(amount: Decimal, resource: Address) -> Self {
        AccessRule::Protected(AccessRuleNode::ProofRule(ProofRule::AmountOf(amount, resource)))
    }
}

impl ToManifestValue for AccessRule {
    fn to_value(&self) -> ManifestValue {
        match self {
            AccessRule::AllowAll => ManifestValue::unit_enum(0),
            AccessRule::DenyAll => ManifestValue::unit_enum(1),
            AccessRule::Protected(node) => ManifestValue::enum_of(2, vec![node.to_value()]),
        }
    }
}

impl FromManifestValue for AccessRule {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        match value.as_enum()? {
            (0, fields) => expect_fields("AccessRule::AllowAll", fields, 0).map(|_| AccessRule::AllowAll),
            (1, fields) => expect_fields("AccessRule::DenyAll", fields, 0).map(|_| AccessRule::DenyAll),
            (2, fields) => Ok(AccessRule::Protected(AccessRuleNode::from_value(&expect_fields("AccessRule::Protected", fields, 1)?[0])?)),
            (d, _) => Err(ManifestError::UnknownDiscriminator { type_name: "AccessRule", discriminator: d }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRole {
    None,
    Fixed(AccessRule),
    Updatable(AccessRule),
}

impl ToManifestValue for OwnerRole {
    fn to_value(&self) -> ManifestValue {
        match self {
            OwnerRole::None => ManifestValue::unit_enum(0),
            OwnerRole::Fixed(rule) => ManifestValue::enum_of(1, vec![rule.to_value()]),
            OwnerRole::Updatable(rule) => ManifestValue::enum_of(2, vec![rule.to_value()]),
        }
    }
}

impl FromManifestValue for OwnerRole {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        match value.as_enum()? {
            (0, fields) => expect_fields("OwnerRole::None", fields, 0).map(|_| OwnerRole::None),
            (1, fields) => Ok(OwnerRole::Fixed(AccessRule::from_value(&expect_fields("OwnerRole::Fixed", fields, 1)?[0])?)),
            (2, fields) => Ok(OwnerRole::Updatable(AccessRule::from_value(&expect_fields("OwnerRole::Updatable", fields, 1)?[0])?)),
            (d, _) => Err(ManifestError::UnknownDiscriminator { type_name: "OwnerRole", discriminator: d }),
        }
    }
}

fn option_rule(rule: &Option<AccessRule>) -> ManifestValue {
    ManifestValue::option(rule.as_ref().map(ToManifestValue::to_value))
}

fn rule_from_option(value: &ManifestValue) -> Result<Option<AccessRule>, ManifestError> {
    value.as_option()?.map(AccessRule::from_value).transpose()
}

/// Regla de un rol de resource manager y regla de quién puede cambiarla.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: Option<AccessRule>,
    pub updater: Option<AccessRule>,
}

impl RoleAssignment {
    /// Rol fijado para siempre: el updater queda en `DenyAll`.
    pub fn locked(role: AccessRule) -> Self {
        Self { role: Some(role),
               updater: Some(AccessRule::DenyAll) }
    }
}

impl ToManifestValue for RoleAssignment {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::Tuple(vec![option_rule(&self.role), option_rule(&self.updater)])
    }
}

impl FromManifestValue for RoleAssignment {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let f = expect_fields("RoleAssignment", value.as_tuple()?, 2)?;
        Ok(Self { role: rule_from_option(&f[0])?,
                  updater: rule_from_option(&f[1])? })
    }
}

fn option_assignment(a: &Option<RoleAssignment>) -> ManifestValue {
    ManifestValue::option(a.as_ref().map(ToManifestValue::to_value))
}

fn assignment_from_option(value: &ManifestValue) -> Result<Option<RoleAssignment>, ManifestError> {
    value.as_option()?.map(RoleAssignment::from_value).transpose()
}

/// Roles de un recurso fungible (tupla de 6 posiciones).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FungibleResourceRoles {
    pub mint: Option<RoleAssignment>,
    pub burn: Option<RoleAssignment>,
    pub freeze: Option<RoleAssignment>,
    pub recall: Option<RoleAssignment>,
    pub withdraw: Option<RoleAssignment>,
    pub deposit: Option<RoleAssignment>,
}

impl ToManifestValue for FungibleResourceRoles {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::Tuple(vec![option_assignment(&self.mint),
                                  option_assignment(&self.burn),
                                  option_assignment(&self.freeze),
                                  option_assignment(&self.recall),
                                  option_assignment(&self.withdraw),
                                  option_assignment(&self.deposit)])
    }
}

impl FromManifestValue for FungibleResourceRoles {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let f = expect_fields("FungibleResourceRoles", value.as_tuple()?, 6)?;
        Ok(Self { mint: assignment_from_option(&f[0])?,
                  burn: assignment_from_option(&f[1])?,
                  freeze: assignment_from_option(&f[2])?,
                  recall: assignment_from_option(&f[3])?,
                  withdraw: assignment_from_option(&f[4])?,
                  deposit: assignment_from_option(&f[5])? })
    }
}

/// Roles de un recurso no fungible: los seis fungibles más la actualización de datos.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NonFungibleResourceRoles {
    pub mint: Option<RoleAssignment>,
    pub burn: Option<RoleAssignment>,
    pub freeze: Option<RoleAssignment>,
    pub recall: Option<RoleAssignment>,
    pub withdraw: Option<RoleAssignment>,
    pub deposit: Option<RoleAssignment>,
    pub data_update: Option<RoleAssignment>,
}

impl ToManifestValue for NonFungibleResourceRoles {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::Tuple(vec![option_assignment(&self.mint),
                                  option_assignment(&self.burn),
                                  option_assignment(&self.freeze),
                                  option_assignment(&self.recall),
                                  option_assignment(&self.withdraw),
                                  option_assignment(&self.deposit),
                                  option_assignment(&self.data_update)])
    }
}

impl FromManifestValue for NonFungibleResourceRoles {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let f = expect_fields("NonFungibleResourceRoles", value.as_tuple()?, 7)?;
        Ok(Self { mint: assignment_from_option(&f[0])?,
                  burn: assignment_from_option(&f[1])?,
                  freeze: assignment_from_option(&f[2])?,
                  recall: assignment_from_option(&f[3])?,
                  withdraw: assignment_from_option(&f[4])?,
                  deposit: assignment_from_option(&f[5])?,
                  data_update: assignment_from_option(&f[6])? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_value;

    fn owner() -> Address {
        Address::parse("resource_tdx_2_1qzxrpw").unwrap()
    }

    #[test]
    fn updatable_owner_role_matches_wire_shape() {
        let role = OwnerRole::Updatable(AccessRule::require_amount("4".parse().unwrap(), owner()));
        let rendered = render_value(&role.to_value());
        assert_eq!(rendered,
                   format!("Enum<2u8>(Enum<2u8>(Enum<0u8>(Enum<1u8>(Decimal(\"4\"), Address(\"{}\")))))", owner()));
    }

    #[test]
    fn require_resource_rule_matches_wire_shape() {
        let rule = AccessRule::require(owner());
        assert_eq!(render_value(&rule.to_value()),
                   format!("Enum<2u8>(Enum<0u8>(Enum<0u8>(Enum<1u8>(Address(\"{}\")))))", owner()));
    }

    #[test]
    fn role_assignment_tuple_uses_options() {
        let burn = RoleAssignment { role: Some(AccessRule::DenyAll), updater: None };
        assert_eq!(render_value(&burn.to_value()), "Tuple(Enum<1u8>(Enum<1u8>()), Enum<0u8>())");
    }

    #[test]
    fn fungible_roles_have_six_slots_and_non_fungible_seven() {
        assert_eq!(FungibleResourceRoles::default().to_value().as_tuple().unwrap().len(), 6);
        assert_eq!(NonFungibleResourceRoles::default().to_value().as_tuple().unwrap().len(), 7);
    }

    #[test]
    fn owner_role_decodes_back_to_typed_value() {
        let role = OwnerRole::Fixed(AccessRule::Protected(AccessRuleNode::AnyOf(vec![
            AccessRuleNode::ProofRule(ProofRule::CountOf(2, vec![ResourceOrNonFungible::Resource(owner())])),
            AccessRuleNode::ProofRule(ProofRule::Require(ResourceOrNonFungible::NonFungible { resource: owner(),
                                                                                            local_id: "#1#".into() })),
        ])));
        assert_eq!(OwnerRole::from_value(&role.to_value()).unwrap(), role);
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let bogus = ManifestValue::unit_enum(7);
        assert!(matches!(AccessRule::from_value(&bogus),
                         Err(ManifestError::UnknownDiscriminator { type_name: "AccessRule", discriminator: 7 })));
    }
}
