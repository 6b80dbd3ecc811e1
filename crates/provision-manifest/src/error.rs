//! Errores del builder, del modelo de valores y del codec binario.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ManifestError {
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("decimal out of range")]
    DecimalOutOfRange,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("unexpected value: expected {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },
    #[error("unknown discriminator {discriminator} for {type_name}")]
    UnknownDiscriminator { type_name: &'static str, discriminator: u8 },
    #[error("wrong field count for {type_name}: expected {expected}, found {found}")]
    FieldCount { type_name: &'static str, expected: usize, found: usize },
    #[error("unexpected end of payload")]
    UnexpectedEof,
    #[error("invalid payload prefix 0x{0:02x}")]
    InvalidPrefix(u8),
    #[error("unknown value kind 0x{0:02x}")]
    UnknownValueKind(u8),
    #[error("invalid utf-8 in string value")]
    InvalidUtf8,
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("array element of kind {found:?} in array of {expected:?}")]
    MismatchedArrayElement { expected: crate::value::ValueKind, found: crate::value::ValueKind },
    #[error("maximum nesting depth exceeded")]
    MaxDepthExceeded,
    #[error("length prefix overflow")]
    LengthOverflow,
    #[error("manifest references blob {0} that is not attached")]
    MissingBlob(String),
}
