//! Modelo de valores tipados de un manifiesto.
//!
//! `ManifestValue` es la unión etiquetada que viaja dentro de cada
//! instrucción. Los índices de variante de los `Enum` forman parte del
//! contrato de cable con el ledger: se reproducen tal cual, nunca se
//! reinterpretan.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

const SCALE: i128 = 1_000_000_000_000_000_000;
const FRACTION_DIGITS: usize = 18;

/// Decimal de punto fijo con 18 dígitos fraccionarios (unidad mínima = 1e-18).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal(i128);

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);
    pub const ONE: Decimal = Decimal(SCALE);

    /// Construye desde la representación cruda escalada (atto-unidades).
    pub const fn from_attos(attos: i128) -> Self {
        Self(attos)
    }

    pub const fn attos(&self) -> i128 {
        self.0
    }

    /// Entero sin parte fraccionaria.
    pub fn from_int(value: i64) -> Self {
        Self(value as i128 * SCALE)
    }

    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        self.0.checked_add(other.0).map(Decimal)
    }

    pub fn checked_sub(self, other: Decimal) -> Option<Decimal> {
        self.0.checked_sub(other.0).map(Decimal)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl FromStr for Decimal {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ManifestError::InvalidDecimal(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac_part.len() > FRACTION_DIGITS {
            return Err(invalid());
        }
        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| ManifestError::DecimalOutOfRange)?
        };
        let mut frac_value: i128 = 0;
        for (i, c) in frac_part.chars().enumerate() {
            let digit = c.to_digit(10).ok_or_else(invalid)? as i128;
            frac_value += digit * 10i128.pow((FRACTION_DIGITS - 1 - i) as u32);
        }
        let magnitude = int_value.checked_mul(SCALE)
                                 .and_then(|v| v.checked_add(frac_value))
                                 .ok_or(ManifestError::DecimalOutOfRange)?;
        Ok(Decimal(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let scale = SCALE as u128;
        let int_part = magnitude / scale;
        let frac_part = magnitude % scale;
        if self.0 < 0 {
            write!(f, "-")?;
        }
        if frac_part == 0 {
            write!(f, "{int_part}")
        } else {
            let frac = format!("{frac_part:018}");
            write!(f, "{int_part}.{}", frac.trim_end_matches('0'))
        }
    }
}

impl TryFrom<String> for Decimal {
    type Error = ManifestError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Decimal> for String {
    fn from(value: Decimal) -> Self {
        value.to_string()
    }
}

/// Clase de entidad codificada en el prefijo legible de una dirección.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Account,
    Component,
    Identity,
    Package,
    Pool,
    Resource,
    Validator,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [EntityKind::Account,
                                      EntityKind::Component,
                                      EntityKind::Identity,
                                      EntityKind::Package,
                                      EntityKind::Pool,
                                      EntityKind::Resource,
                                      EntityKind::Validator];

    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Component => "component",
            EntityKind::Identity => "identity",
            EntityKind::Package => "package",
            EntityKind::Pool => "pool",
            EntityKind::Resource => "resource",
            EntityKind::Validator => "validator",
        }
    }
}

/// Alfabeto bech32 (sin `1`, `b`, `i`, `o`).
pub const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Dirección global del ledger (`resource_tdx_2_1...`, `account_rdx1...`).
///
/// Sólo se valida la forma: prefijo de entidad conocido, separador `1` y
/// datos en alfabeto bech32. El checksum lo valida el ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        let invalid = || ManifestError::InvalidAddress(s.to_string());
        let sep = s.rfind('1').ok_or_else(invalid)?;
        let (hrp, data) = (&s[..sep], &s[sep + 1..]);
        if data.is_empty() || !data.chars().all(|c| BECH32_CHARSET.contains(c)) {
            return Err(invalid());
        }
        let kind = EntityKind::ALL.iter()
                                  .find(|k| hrp.strip_prefix(k.prefix()).is_some_and(|rest| rest.starts_with('_')))
                                  .ok_or_else(invalid)?;
        if hrp.len() <= kind.prefix().len() + 1 {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn entity_kind(&self) -> EntityKind {
        EntityKind::ALL.iter()
                       .copied()
                       .find(|k| self.0.starts_with(k.prefix()) && self.0[k.prefix().len()..].starts_with('_'))
                       .unwrap_or(EntityKind::Component)
    }

    /// Sufijo de red del HRP (`rdx`, `tdx_2_`), sin el prefijo de entidad.
    pub fn network_suffix(&self) -> &str {
        let sep = self.0.rfind('1').unwrap_or(self.0.len());
        let prefix_len = self.entity_kind().prefix().len() + 1;
        &self.0[prefix_len.min(sep)..sep]
    }
}

impl FromStr for Address {
    type Err = ManifestError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ManifestError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Expresiones de manifiesto soportadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expression {
    EntireWorktop,
    EntireAuthZone,
}

/// Referencia a un blob adjunto al manifiesto (hash blake3 del contenido).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobRef(pub [u8; 32]);

impl BlobRef {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Tipo de valor (byte de cabecera en la codificación binaria).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 0x01,
    I32 = 0x04,
    I64 = 0x05,
    U8 = 0x07,
    U16 = 0x08,
    U32 = 0x09,
    U64 = 0x0a,
    U128 = 0x0b,
    String = 0x0c,
    Array = 0x20,
    Tuple = 0x21,
    Enum = 0x22,
    Map = 0x23,
    Address = 0x80,
    Bucket = 0x81,
    Expression = 0x83,
    Blob = 0x84,
    Decimal = 0x85,
}

impl ValueKind {
    pub fn from_byte(byte: u8) -> Result<Self, ManifestError> {
        Ok(match byte {
            0x01 => ValueKind::Bool,
            0x04 => ValueKind::I32,
            0x05 => ValueKind::I64,
            0x07 => ValueKind::U8,
            0x08 => ValueKind::U16,
            0x09 => ValueKind::U32,
            0x0a => ValueKind::U64,
            0x0b => ValueKind::U128,
            0x0c => ValueKind::String,
            0x20 => ValueKind::Array,
            0x21 => ValueKind::Tuple,
            0x22 => ValueKind::Enum,
            0x23 => ValueKind::Map,
            0x80 => ValueKind::Address,
            0x81 => ValueKind::Bucket,
            0x83 => ValueKind::Expression,
            0x84 => ValueKind::Blob,
            0x85 => ValueKind::Decimal,
            other => return Err(ManifestError::UnknownValueKind(other)),
        })
    }

    /// Nombre usado en el manifiesto textual (`Array<Enum>`, `Map<String, Tuple>`).
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "Bool",
            ValueKind::I32 => "I32",
            ValueKind::I64 => "I64",
            ValueKind::U8 => "U8",
            ValueKind::U16 => "U16",
            ValueKind::U32 => "U32",
            ValueKind::U64 => "U64",
            ValueKind::U128 => "U128",
            ValueKind::String => "String",
            ValueKind::Array => "Array",
            ValueKind::Tuple => "Tuple",
            ValueKind::Enum => "Enum",
            ValueKind::Map => "Map",
            ValueKind::Address => "Address",
            ValueKind::Bucket => "Bucket",
            ValueKind::Expression => "Expression",
            ValueKind::Blob => "Blob",
            ValueKind::Decimal => "Decimal",
        }
    }
}

/// Valor tipado de manifiesto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    String(String),
    Decimal(Decimal),
    Address(Address),
    Bucket(String),
    Expression(Expression),
    Blob(BlobRef),
    Enum { discriminator: u8, fields: Vec<ManifestValue> },
    Array { element_kind: ValueKind, elements: Vec<ManifestValue> },
    Tuple(Vec<ManifestValue>),
    Map { key_kind: ValueKind, value_kind: ValueKind, entries: Vec<(ManifestValue, ManifestValue)> },
}

impl ManifestValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ManifestValue::Bool(_) => ValueKind::Bool,
            ManifestValue::I32(_) => ValueKind::I32,
            ManifestValue::I64(_) => ValueKind::I64,
            ManifestValue::U8(_) => ValueKind::U8,
            ManifestValue::U16(_) => ValueKind::U16,
            ManifestValue::U32(_) => ValueKind::U32,
            ManifestValue::U64(_) => ValueKind::U64,
            ManifestValue::U128(_) => ValueKind::U128,
            ManifestValue::String(_) => ValueKind::String,
            ManifestValue::Decimal(_) => ValueKind::Decimal,
            ManifestValue::Address(_) => ValueKind::Address,
            ManifestValue::Bucket(_) => ValueKind::Bucket,
            ManifestValue::Expression(_) => ValueKind::Expression,
            ManifestValue::Blob(_) => ValueKind::Blob,
            ManifestValue::Enum { .. } => ValueKind::Enum,
            ManifestValue::Array { .. } => ValueKind::Array,
            ManifestValue::Tuple(_) => ValueKind::Tuple,
            ManifestValue::Map { .. } => ValueKind::Map,
        }
    }

    pub fn enum_of(discriminator: u8, fields: Vec<ManifestValue>) -> Self {
        ManifestValue::Enum { discriminator, fields }
    }

    pub fn unit_enum(discriminator: u8) -> Self {
        ManifestValue::Enum { discriminator, fields: vec![] }
    }

    pub fn array(element_kind: ValueKind, elements: Vec<ManifestValue>) -> Self {
        ManifestValue::Array { element_kind, elements }
    }

    /// `Option<T>` del ledger: `None` = `Enum<0>()`, `Some(x)` = `Enum<1>(x)`.
    pub fn option(value: Option<ManifestValue>) -> Self {
        match value {
            None => ManifestValue::unit_enum(0),
            Some(v) => ManifestValue::enum_of(1, vec![v]),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        ManifestValue::String(s.into())
    }

    fn mismatch(&self, expected: &str) -> ManifestError {
        ManifestError::UnexpectedValue { expected: expected.to_string(),
                                         found: self.kind().type_name().to_string() }
    }

    pub fn as_bool(&self) -> Result<bool, ManifestError> {
        match self {
            ManifestValue::Bool(b) => Ok(*b),
            other => Err(other.mismatch("Bool")),
        }
    }

    pub fn as_u8(&self) -> Result<u8, ManifestError> {
        match self {
            ManifestValue::U8(v) => Ok(*v),
            other => Err(other.mismatch("U8")),
        }
    }

    pub fn as_u32(&self) -> Result<u32, ManifestError> {
        match self {
            ManifestValue::U32(v) => Ok(*v),
            other => Err(other.mismatch("U32")),
        }
    }

    pub fn as_u64(&self) -> Result<u64, ManifestError> {
        match self {
            ManifestValue::U64(v) => Ok(*v),
            other => Err(other.mismatch("U64")),
        }
    }

    pub fn as_string(&self) -> Result<&str, ManifestError> {
        match self {
            ManifestValue::String(s) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal, ManifestError> {
        match self {
            ManifestValue::Decimal(d) => Ok(*d),
            other => Err(other.mismatch("Decimal")),
        }
    }

    pub fn as_address(&self) -> Result<&Address, ManifestError> {
        match self {
            ManifestValue::Address(a) => Ok(a),
            other => Err(other.mismatch("Address")),
        }
    }

    pub fn as_bucket(&self) -> Result<&str, ManifestError> {
        match self {
            ManifestValue::Bucket(b) => Ok(b),
            other => Err(other.mismatch("Bucket")),
        }
    }

    pub fn as_blob(&self) -> Result<BlobRef, ManifestError> {
        match self {
            ManifestValue::Blob(b) => Ok(*b),
            other => Err(other.mismatch("Blob")),
        }
    }

    pub fn as_expression(&self) -> Result<Expression, ManifestError> {
        match self {
            ManifestValue::Expression(e) => Ok(*e),
            other => Err(other.mismatch("Expression")),
        }
    }

    pub fn as_tuple(&self) -> Result<&[ManifestValue], ManifestError> {
        match self {
            ManifestValue::Tuple(fields) => Ok(fields),
            other => Err(other.mismatch("Tuple")),
        }
    }

    pub fn as_enum(&self) -> Result<(u8, &[ManifestValue]), ManifestError> {
        match self {
            ManifestValue::Enum { discriminator, fields } => Ok((*discriminator, fields)),
            other => Err(other.mismatch("Enum")),
        }
    }

    pub fn as_array(&self) -> Result<&[ManifestValue], ManifestError> {
        match self {
            ManifestValue::Array { elements, .. } => Ok(elements),
            other => Err(other.mismatch("Array")),
        }
    }

    pub fn as_map(&self) -> Result<&[(ManifestValue, ManifestValue)], ManifestError> {
        match self {
            ManifestValue::Map { entries, .. } => Ok(entries),
            other => Err(other.mismatch("Map")),
        }
    }

    /// Lee un `Option<T>` del ledger.
    pub fn as_option(&self) -> Result<Option<&ManifestValue>, ManifestError> {
        match self.as_enum()? {
            (0, fields) => {
                expect_fields("Option::None", fields, 0)?;
                Ok(None)
            }
            (1, fields) => Ok(Some(&expect_fields("Option::Some", fields, 1)?[0])),
            (d, _) => Err(ManifestError::UnknownDiscriminator { type_name: "Option", discriminator: d }),
        }
    }
}

/// Conversión de un tipo fuerte a su representación de manifiesto.
pub trait ToManifestValue {
    fn to_value(&self) -> ManifestValue;
}

/// Conversión inversa; falla si la forma no coincide con el contrato.
pub trait FromManifestValue: Sized {
    fn from_value(value: &ManifestValue) -> Result<Self, ManifestError>;
}

/// Valida la cantidad de campos de una variante o tupla.
pub(crate) fn expect_fields<'a>(type_name: &'static str,
                                fields: &'a [ManifestValue],
                                expected: usize)
                                -> Result<&'a [ManifestValue], ManifestError> {
    if fields.len() != expected {
        return Err(ManifestError::FieldCount { type_name,
                                               expected,
                                               found: fields.len() });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_parses_and_displays_canonically() {
        let d: Decimal = "0.55".parse().unwrap();
        assert_eq!(d.attos(), 550_000_000_000_000_000);
        assert_eq!(d.to_string(), "0.55");
        assert_eq!("100".parse::<Decimal>().unwrap().to_string(), "100");
        assert_eq!("-1.5".parse::<Decimal>().unwrap().to_string(), "-1.5");
        assert_eq!("112237180.296872849296766891".parse::<Decimal>().unwrap().to_string(),
                   "112237180.296872849296766891");
    }

    #[test]
    fn decimal_rejects_malformed_text() {
        assert!("".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("abc".parse::<Decimal>().is_err());
        assert!("0.0000000000000000001".parse::<Decimal>().is_err());
    }

    #[test]
    fn decimal_orders_numerically() {
        let small: Decimal = "500".parse().unwrap();
        let big: Decimal = "1000".parse().unwrap();
        assert!(small < big);
        assert_eq!(Decimal::from_int(1000), big);
    }

    #[test]
    fn address_validates_prefix_and_charset() {
        let a = Address::parse("resource_tdx_2_1qqqqqq").unwrap();
        assert_eq!(a.entity_kind(), EntityKind::Resource);
        assert_eq!(a.network_suffix(), "tdx_2_");
        let b = Address::parse("account_rdx1pzry9x").unwrap();
        assert_eq!(b.entity_kind(), EntityKind::Account);
        assert_eq!(b.network_suffix(), "rdx");
        assert!(Address::parse("wallet_rdx1qqqq").is_err());
        assert!(Address::parse("resource_rdx1").is_err());
        assert!(Address::parse("resource_rdx1bbb").is_err());
        assert!(Address::parse("resource_1qqqq").is_err());
    }

    #[test]
    fn option_helpers_follow_ledger_discriminators() {
        let none = ManifestValue::option(None);
        let some = ManifestValue::option(Some(ManifestValue::U8(3)));
        assert_eq!(none.as_option().unwrap(), None);
        assert_eq!(some.as_option().unwrap(), Some(&ManifestValue::U8(3)));
        assert_eq!(some.as_enum().unwrap().0, 1);
    }
}
