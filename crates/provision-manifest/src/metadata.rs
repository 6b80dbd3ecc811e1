//! Metadata declarativa (clave -> valor tipado) y esquema de datos no fungibles.

use std::collections::BTreeMap;

use crate::error::ManifestError;
use crate::roles::AccessRule;
use crate::value::{expect_fields, Address, Decimal, FromManifestValue, ManifestValue, ToManifestValue, ValueKind};

/// Valor de metadata. El discriminador es el índice de `MetadataValue` del ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    U8(u8),
    U32(u32),
    U64(u64),
    I32(i32),
    I64(i64),
    Decimal(Decimal),
    GlobalAddress(Address),
    Url(String),
    Origin(String),
    StringArray(Vec<String>),
    GlobalAddressArray(Vec<Address>),
    UrlArray(Vec<String>),
    OriginArray(Vec<String>),
}

impl MetadataValue {
    pub fn discriminator(&self) -> u8 {
        match self {
            MetadataValue::String(_) => 0,
            MetadataValue::Bool(_) => 1,
            MetadataValue::U8(_) => 2,
            MetadataValue::U32(_) => 3,
            MetadataValue::U64(_) => 4,
            MetadataValue::I32(_) => 5,
            MetadataValue::I64(_) => 6,
            MetadataValue::Decimal(_) => 7,
            MetadataValue::GlobalAddress(_) => 8,
            MetadataValue::Url(_) => 13,
            MetadataValue::Origin(_) => 14,
            MetadataValue::StringArray(_) => 128,
            MetadataValue::GlobalAddressArray(_) => 136,
            MetadataValue::UrlArray(_) => 141,
            MetadataValue::OriginArray(_) => 142,
        }
    }
}

fn strings(items: &[String]) -> ManifestValue {
    ManifestValue::array(ValueKind::String, items.iter().cloned().map(ManifestValue::String).collect())
}

fn strings_from(value: &ManifestValue) -> Result<Vec<String>, ManifestError> {
    value.as_array()?.iter().map(|v| v.as_string().map(str::to_string)).collect()
}

impl ToManifestValue for MetadataValue {
    fn to_value(&self) -> ManifestValue {
        let inner = match self {
            MetadataValue::String(s) | MetadataValue::Url(s) | MetadataValue::Origin(s) => ManifestValue::String(s.clone()),
            MetadataValue::Bool(b) => ManifestValue::Bool(*b),
            MetadataValue::U8(v) => ManifestValue::U8(*v),
            MetadataValue::U32(v) => ManifestValue::U32(*v),
            MetadataValue::U64(v) => ManifestValue::U64(*v),
            MetadataValue::I32(v) => ManifestValue::I32(*v),
            MetadataValue::I64(v) => ManifestValue::I64(*v),
            MetadataValue::Decimal(d) => ManifestValue::Decimal(*d),
            MetadataValue::GlobalAddress(a) => ManifestValue::Address(a.clone()),
            MetadataValue::StringArray(items) | MetadataValue::UrlArray(items) | MetadataValue::OriginArray(items) => strings(items),
            MetadataValue::GlobalAddressArray(items) => {
                ManifestValue::array(ValueKind::Address, items.iter().cloned().map(ManifestValue::Address).collect())
            }
        };
        ManifestValue::enum_of(self.discriminator(), vec![inner])
    }
}

impl FromManifestValue for MetadataValue {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let (d, fields) = value.as_enum()?;
        let v = &expect_fields("MetadataValue", fields, 1)?[0];
        Ok(match d {
            0 => MetadataValue::String(v.as_string()?.to_string()),
            1 => MetadataValue::Bool(v.as_bool()?),
            2 => MetadataValue::U8(v.as_u8()?),
            3 => MetadataValue::U32(v.as_u32()?),
            4 => MetadataValue::U64(v.as_u64()?),
            5 => match v {
                ManifestValue::I32(x) => MetadataValue::I32(*x),
                other => return Err(ManifestError::UnexpectedValue { expected: "I32".into(),
                                                                     found: other.kind().type_name().into() }),
            },
            6 => match v {
                ManifestValue::I64(x) => MetadataValue::I64(*x),
                other => return Err(ManifestError::UnexpectedValue { expected: "I64".into(),
                                                                     found: other.kind().type_name().into() }),
            },
            7 => MetadataValue::Decimal(v.as_decimal()?),
            8 => MetadataValue::GlobalAddress(v.as_address()?.clone()),
            13 => MetadataValue::Url(v.as_string()?.to_string()),
            14 => MetadataValue::Origin(v.as_string()?.to_string()),
            128 => MetadataValue::StringArray(strings_from(v)?),
            136 => MetadataValue::GlobalAddressArray(v.as_array()?
                                                      .iter()
                                                      .map(|a| a.as_address().cloned())
                                                      .collect::<Result<_, _>>()?),
            141 => MetadataValue::UrlArray(strings_from(v)?),
            142 => MetadataValue::OriginArray(strings_from(v)?),
            d => return Err(ManifestError::UnknownDiscriminator { type_name: "MetadataValue", discriminator: d }),
        })
    }
}

/// Entrada inicial de metadata. `locked = false` permite al owner actualizarla luego.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub value: MetadataValue,
    pub locked: bool,
}

impl MetadataEntry {
    pub fn locked(value: MetadataValue) -> Self {
        Self { value, locked: true }
    }

    pub fn updatable(value: MetadataValue) -> Self {
        Self { value, locked: false }
    }
}

/// Configuración del módulo de metadata de una entidad nueva.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataConfig {
    pub init: BTreeMap<String, MetadataEntry>,
    pub roles: BTreeMap<String, Option<AccessRule>>,
}

impl MetadataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega una entrada y devuelve la configuración resultante.
    pub fn with(mut self, key: &str, entry: MetadataEntry) -> Self {
        self.init.insert(key.to_string(), entry);
        self
    }
}

impl ToManifestValue for MetadataConfig {
    fn to_value(&self) -> ManifestValue {
        let init = self.init
                       .iter()
                       .map(|(k, e)| {
                           (ManifestValue::String(k.clone()),
                            ManifestValue::Tuple(vec![ManifestValue::option(Some(e.value.to_value())), ManifestValue::Bool(e.locked)]))
                       })
                       .collect();
        let roles = self.roles
                        .iter()
                        .map(|(k, r)| (ManifestValue::String(k.clone()), ManifestValue::option(r.as_ref().map(ToManifestValue::to_value))))
                        .collect();
        ManifestValue::Tuple(vec![ManifestValue::Map { key_kind: ValueKind::String,
                                                       value_kind: ValueKind::Tuple,
                                                       entries: init },
                                  ManifestValue::Map { key_kind: ValueKind::String,
                                                       value_kind: ValueKind::Enum,
                                                       entries: roles }])
    }
}

impl FromManifestValue for MetadataConfig {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let f = expect_fields("MetadataConfig", value.as_tuple()?, 2)?;
        let mut init = BTreeMap::new();
        for (k, v) in f[0].as_map()? {
            let entry = expect_fields("MetadataEntry", v.as_tuple()?, 2)?;
            let inner = entry[0].as_option()?
                                .ok_or_else(|| ManifestError::UnexpectedValue { expected: "Some(MetadataValue)".into(),
                                                                                found: "None".into() })?;
            init.insert(k.as_string()?.to_string(),
                        MetadataEntry { value: MetadataValue::from_value(inner)?,
                                        locked: entry[1].as_bool()? });
        }
        let mut roles = BTreeMap::new();
        for (k, v) in f[1].as_map()? {
            roles.insert(k.as_string()?.to_string(), v.as_option()?.map(AccessRule::from_value).transpose()?);
        }
        Ok(Self { init, roles })
    }
}

/// Tipo de identificador local de un recurso no fungible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonFungibleIdType {
    String,
    Integer,
    Bytes,
    Ruid,
}

impl ToManifestValue for NonFungibleIdType {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::unit_enum(match self {
                                     NonFungibleIdType::String => 0,
                                     NonFungibleIdType::Integer => 1,
                                     NonFungibleIdType::Bytes => 2,
                                     NonFungibleIdType::Ruid => 3,
                                 })
    }
}

impl FromManifestValue for NonFungibleIdType {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let (d, fields) = value.as_enum()?;
        expect_fields("NonFungibleIdType", fields, 0)?;
        match d {
            0 => Ok(NonFungibleIdType::String),
            1 => Ok(NonFungibleIdType::Integer),
            2 => Ok(NonFungibleIdType::Bytes),
            3 => Ok(NonFungibleIdType::Ruid),
            d => Err(ManifestError::UnknownDiscriminator { type_name: "NonFungibleIdType", discriminator: d }),
        }
    }
}

/// Tipo primitivo de un campo de datos no fungibles (id de tipo bien conocido).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U64,
    String,
    Decimal,
    Url,
}

impl FieldKind {
    pub fn type_id(&self) -> u8 {
        match self {
            FieldKind::U64 => 10,
            FieldKind::String => 12,
            FieldKind::Decimal => 192,
            FieldKind::Url => 198,
        }
    }

    pub fn from_type_id(id: u8) -> Result<Self, ManifestError> {
        Ok(match id {
            10 => FieldKind::U64,
            12 => FieldKind::String,
            192 => FieldKind::Decimal,
            198 => FieldKind::Url,
            d => return Err(ManifestError::UnknownDiscriminator { type_name: "FieldKind", discriminator: d }),
        })
    }
}

/// Esquema local de datos de un NFT: un struct con campos primitivos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFungibleSchema {
    pub type_name: String,
    pub fields: Vec<(String, FieldKind)>,
    pub mutable_fields: Vec<String>,
}

impl ToManifestValue for NonFungibleSchema {
    // Enum<0>(Enum<0>(Tuple(type_kinds, type_metadata, type_validations)), Enum<1>(0u64), mutable_fields)
    fn to_value(&self) -> ManifestValue {
        let field_kinds = self.fields
                              .iter()
                              .map(|(_, k)| ManifestValue::enum_of(0, vec![ManifestValue::U8(k.type_id())]))
                              .collect();
        let type_kinds = ManifestValue::array(ValueKind::Enum,
                                              vec![ManifestValue::enum_of(14, vec![ManifestValue::array(ValueKind::Enum, field_kinds)])]);
        let names: Vec<String> = self.fields.iter().map(|(n, _)| n.clone()).collect();
        let type_metadata = ManifestValue::array(ValueKind::Tuple,
                                                 vec![ManifestValue::Tuple(vec![
            ManifestValue::enum_of(1, vec![ManifestValue::String(self.type_name.clone())]),
            ManifestValue::enum_of(1, vec![ManifestValue::enum_of(0, vec![strings(&names)])]),
        ])]);
        let type_validations = ManifestValue::array(ValueKind::Enum, vec![ManifestValue::unit_enum(0)]);
        let schema = ManifestValue::enum_of(0, vec![ManifestValue::Tuple(vec![type_kinds, type_metadata, type_validations])]);
        ManifestValue::enum_of(0,
                               vec![schema,
                                    ManifestValue::enum_of(1, vec![ManifestValue::U64(0)]),
                                    strings(&self.mutable_fields)])
    }
}

impl FromManifestValue for NonFungibleSchema {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError> {
        let (_, outer) = value.as_enum()?;
        let outer = expect_fields("NonFungibleDataSchema", outer, 3)?;
        let (_, versioned) = outer[0].as_enum()?;
        let parts = expect_fields("Schema", expect_fields("VersionedSchema", versioned, 1)?[0].as_tuple()?, 3)?;

        let kinds = parts[0].as_array()?;
        let (_, tuple_kind) = kinds.first()
                                   .ok_or(ManifestError::FieldCount { type_name: "TypeKinds", expected: 1, found: 0 })?
                                   .as_enum()?;
        let field_kinds = expect_fields("TupleKind", tuple_kind, 1)?[0].as_array()?
                                                                       .iter()
                                                                       .map(|k| {
                                                                           let (_, f) = k.as_enum()?;
                                                                           FieldKind::from_type_id(expect_fields("WellKnown", f, 1)?[0].as_u8()?)
                                                                       })
                                                                       .collect::<Result<Vec<_>, _>>()?;

        let meta = parts[1].as_array()?;
        let meta = expect_fields("TypeMetadata", meta.first()
                                                     .ok_or(ManifestError::FieldCount { type_name: "TypeMetadata", expected: 1, found: 0 })?
                                                     .as_tuple()?, 2)?;
        let type_name = meta[0].as_option()?
                               .map(|v| v.as_string().map(str::to_string))
                               .transpose()?
                               .unwrap_or_default();
        let names = match meta[1].as_option()? {
            Some(child) => strings_from(&expect_fields("ChildNames", child.as_enum()?.1, 1)?[0])?,
            None => vec![],
        };
        if names.len() != field_kinds.len() {
            return Err(ManifestError::FieldCount { type_name: "NonFungibleSchema",
                                                   expected: field_kinds.len(),
                                                   found: names.len() });
        }
        Ok(Self { type_name,
                  fields: names.into_iter().zip(field_kinds).collect(),
                  mutable_fields: strings_from(&outer[2])? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_value;

    #[test]
    fn metadata_entry_renders_some_value_and_lock_flag() {
        let cfg = MetadataConfig::new().with("icon_url", MetadataEntry::updatable(MetadataValue::Url("https://x.io/i.png".into())));
        assert_eq!(render_value(&cfg.to_value()),
                   "Tuple(Map<String, Tuple>(\"icon_url\" => Tuple(Enum<1u8>(Enum<13u8>(\"https://x.io/i.png\")), false)), Map<String, Enum>())");
    }

    #[test]
    fn origin_array_uses_array_discriminator() {
        let v = MetadataValue::OriginArray(vec!["https://a.io".into()]);
        assert_eq!(v.to_value().as_enum().unwrap().0, 142);
        assert_eq!(MetadataValue::from_value(&v.to_value()).unwrap(), v);
    }

    #[test]
    fn schema_round_trips_through_manifest_value() {
        let schema = NonFungibleSchema { type_name: "ReferralData".into(),
                                         fields: vec![("name".into(), FieldKind::String),
                                                      ("key_image_url".into(), FieldKind::Url),
                                                      ("fee_referral".into(), FieldKind::Decimal),
                                                      ("referrals".into(), FieldKind::U64)],
                                         mutable_fields: vec!["referrals".into()] };
        let value = schema.to_value();
        assert!(render_value(&value).starts_with("Enum<0u8>(Enum<0u8>(Tuple(Array<Enum>(Enum<14u8>(Array<Enum>(Enum<0u8>(12u8), Enum<0u8>(198u8)"));
        assert_eq!(NonFungibleSchema::from_value(&value).unwrap(), schema);
    }
}
