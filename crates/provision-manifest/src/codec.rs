//! Codec binario de valores y manifiestos.
//!
//! Formato: byte de prefijo `0x4d`, luego `kind` + cuerpo de cada valor.
//! Las longitudes son LEB128. Los elementos de `Array` y `Map` llevan sólo
//! su cuerpo (el `kind` se declara una vez en la cabecera). Un manifiesto es
//! un `Array<Enum>` de instrucciones seguido de la lista de blobs.

use crate::error::ManifestError;
use crate::instruction::{Instruction, Manifest};
use crate::value::{Address, BlobRef, Decimal, Expression, FromManifestValue, ManifestValue, ToManifestValue, ValueKind};

pub const PAYLOAD_PREFIX: u8 = 0x4d;
pub const MAX_DEPTH: usize = 64;

pub fn encode_value(value: &ManifestValue) -> Result<Vec<u8>, ManifestError> {
    let mut enc = Encoder { buf: vec![PAYLOAD_PREFIX] };
    enc.write_value(value, 0)?;
    Ok(enc.buf)
}

pub fn decode_value(bytes: &[u8]) -> Result<ManifestValue, ManifestError> {
    let mut dec = Decoder::new(bytes)?;
    let value = dec.read_value(0)?;
    dec.finish()?;
    Ok(value)
}

pub fn encode_manifest(manifest: &Manifest) -> Result<Vec<u8>, ManifestError> {
    let instructions = ManifestValue::array(ValueKind::Enum, manifest.instructions.iter().map(ToManifestValue::to_value).collect());
    let mut enc = Encoder { buf: vec![PAYLOAD_PREFIX] };
    enc.write_value(&instructions, 0)?;
    enc.write_len(manifest.blobs.len());
    for blob in &manifest.blobs {
        enc.write_len(blob.len());
        enc.buf.extend_from_slice(blob);
    }
    Ok(enc.buf)
}

pub fn decode_manifest(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let mut dec = Decoder::new(bytes)?;
    let instructions = dec.read_value(0)?
                          .as_array()?
                          .iter()
                          .map(Instruction::from_value)
                          .collect::<Result<Vec<_>, _>>()?;
    let count = dec.read_len()?;
    let mut blobs = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let len = dec.read_len()?;
        blobs.push(dec.take(len)?.to_vec());
    }
    dec.finish()?;
    for instruction in &instructions {
        if let Instruction::PublishPackage { code, definition, .. } = instruction {
            for blob in [code, definition] {
                if !blobs.iter().any(|b| BlobRef::of(b) == *blob) {
                    return Err(ManifestError::MissingBlob(blob.to_hex()));
                }
            }
        }
    }
    Ok(Manifest { instructions, blobs })
}

struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn write_len(&mut self, mut len: usize) {
        loop {
            let byte = (len & 0x7f) as u8;
            len >>= 7;
            if len == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_value(&mut self, value: &ManifestValue, depth: usize) -> Result<(), ManifestError> {
        self.buf.push(value.kind() as u8);
        self.write_body(value, depth)
    }

    fn write_body(&mut self, value: &ManifestValue, depth: usize) -> Result<(), ManifestError> {
        if depth > MAX_DEPTH {
            return Err(ManifestError::MaxDepthExceeded);
        }
        match value {
            ManifestValue::Bool(b) => self.buf.push(u8::from(*b)),
            ManifestValue::I32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::I64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::U8(v) => self.buf.push(*v),
            ManifestValue::U16(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::U32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::U64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::U128(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            ManifestValue::String(s) | ManifestValue::Bucket(s) => self.write_str(s),
            ManifestValue::Address(a) => self.write_str(a.as_str()),
            ManifestValue::Decimal(d) => {
                let attos = d.attos();
                self.buf.extend_from_slice(&attos.to_le_bytes());
                let ext = if attos < 0 { 0xff } else { 0x00 };
                self.buf.extend_from_slice(&[ext; 8]);
            }
            ManifestValue::Expression(e) => self.buf.push(match e {
                                                              Expression::EntireWorktop => 0,
                                                              Expression::EntireAuthZone => 1,
                                                          }),
            ManifestValue::Blob(b) => self.buf.extend_from_slice(&b.0),
            ManifestValue::Enum { discriminator, fields } => {
                self.buf.push(*discriminator);
                self.write_len(fields.len());
                for f in fields {
                    self.write_value(f, depth + 1)?;
                }
            }
            ManifestValue::Tuple(fields) => {
                self.write_len(fields.len());
                for f in fields {
                    self.write_value(f, depth + 1)?;
                }
            }
            ManifestValue::Array { element_kind, elements } => {
                self.buf.push(*element_kind as u8);
                self.write_len(elements.len());
                for e in elements {
                    check_kind(*element_kind, e)?;
                    self.write_body(e, depth + 1)?;
                }
            }
            ManifestValue::Map { key_kind,
                                 value_kind,
                                 entries, } => {
                self.buf.push(*key_kind as u8);
                self.buf.push(*value_kind as u8);
                self.write_len(entries.len());
                for (k, v) in entries {
                    check_kind(*key_kind, k)?;
                    check_kind(*value_kind, v)?;
                    self.write_body(k, depth + 1)?;
                    self.write_body(v, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

fn check_kind(expected: ValueKind, value: &ManifestValue) -> Result<(), ManifestError> {
    if value.kind() != expected {
        return Err(ManifestError::MismatchedArrayElement { expected,
                                                           found: value.kind() });
    }
    Ok(())
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, ManifestError> {
        match bytes.first() {
            None => Err(ManifestError::UnexpectedEof),
            Some(&PAYLOAD_PREFIX) => Ok(Self { bytes, pos: 1 }),
            Some(other) => Err(ManifestError::InvalidPrefix(*other)),
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn finish(&self) -> Result<(), ManifestError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ManifestError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ManifestError> {
        if n > self.remaining() {
            return Err(ManifestError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ManifestError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, ManifestError> {
        Ok(self.take(1)?[0])
    }

    fn read_len(&mut self) -> Result<usize, ManifestError> {
        let mut result: usize = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let chunk = (byte & 0x7f) as usize;
            // El último grupo de 7 bits no puede pasarse del ancho de usize.
            if shift >= usize::BITS || (chunk << shift) >> shift != chunk {
                return Err(ManifestError::LengthOverflow);
            }
            result |= chunk << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    // Cada elemento ocupa al menos un byte: un conteo mayor al resto es corrupto.
    fn read_count(&mut self) -> Result<usize, ManifestError> {
        let n = self.read_len()?;
        if n > self.remaining() {
            return Err(ManifestError::UnexpectedEof);
        }
        Ok(n)
    }

    fn read_string(&mut self) -> Result<String, ManifestError> {
        let len = self.read_len()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ManifestError::InvalidUtf8)
    }

    fn read_value(&mut self, depth: usize) -> Result<ManifestValue, ManifestError> {
        let kind = ValueKind::from_byte(self.read_u8()?)?;
        self.read_body(kind, depth)
    }

    fn read_body(&mut self, kind: ValueKind, depth: usize) -> Result<ManifestValue, ManifestError> {
        if depth > MAX_DEPTH {
            return Err(ManifestError::MaxDepthExceeded);
        }
        Ok(match kind {
            ValueKind::Bool => match self.read_u8()? {
                0 => ManifestValue::Bool(false),
                1 => ManifestValue::Bool(true),
                other => return Err(ManifestError::UnexpectedValue { expected: "bool byte".into(),
                                                                     found: format!("0x{other:02x}") }),
            },
            ValueKind::I32 => ManifestValue::I32(i32::from_le_bytes(self.take_array()?)),
            ValueKind::I64 => ManifestValue::I64(i64::from_le_bytes(self.take_array()?)),
            ValueKind::U8 => ManifestValue::U8(self.read_u8()?),
            ValueKind::U16 => ManifestValue::U16(u16::from_le_bytes(self.take_array()?)),
            ValueKind::U32 => ManifestValue::U32(u32::from_le_bytes(self.take_array()?)),
            ValueKind::U64 => ManifestValue::U64(u64::from_le_bytes(self.take_array()?)),
            ValueKind::U128 => ManifestValue::U128(u128::from_le_bytes(self.take_array()?)),
            ValueKind::String => ManifestValue::String(self.read_string()?),
            ValueKind::Bucket => ManifestValue::Bucket(self.read_string()?),
            ValueKind::Address => ManifestValue::Address(Address::parse(&self.read_string()?)?),
            ValueKind::Decimal => {
                let raw: [u8; 24] = self.take_array()?;
                let mut low = [0u8; 16];
                low.copy_from_slice(&raw[..16]);
                let attos = i128::from_le_bytes(low);
                let ext = if attos < 0 { 0xff } else { 0x00 };
                if raw[16..].iter().any(|b| *b != ext) {
                    return Err(ManifestError::DecimalOutOfRange);
                }
                ManifestValue::Decimal(Decimal::from_attos(attos))
            }
            ValueKind::Expression => match self.read_u8()? {
                0 => ManifestValue::Expression(Expression::EntireWorktop),
                1 => ManifestValue::Expression(Expression::EntireAuthZone),
                d => return Err(ManifestError::UnknownDiscriminator { type_name: "Expression", discriminator: d }),
            },
            ValueKind::Blob => ManifestValue::Blob(BlobRef(self.take_array()?)),
            ValueKind::Enum => {
                let discriminator = self.read_u8()?;
                let n = self.read_count()?;
                let mut fields = Vec::with_capacity(n);
                for _ in 0..n {
                    fields.push(self.read_value(depth + 1)?);
                }
                ManifestValue::Enum { discriminator, fields }
            }
            ValueKind::Tuple => {
                let n = self.read_count()?;
                let mut fields = Vec::with_capacity(n);
                for _ in 0..n {
                    fields.push(self.read_value(depth + 1)?);
                }
                ManifestValue::Tuple(fields)
            }
            ValueKind::Array => {
                let element_kind = ValueKind::from_byte(self.read_u8()?)?;
                let n = self.read_count()?;
                let mut elements = Vec::with_capacity(n);
                for _ in 0..n {
                    elements.push(self.read_body(element_kind, depth + 1)?);
                }
                ManifestValue::Array { element_kind, elements }
            }
            ValueKind::Map => {
                let key_kind = ValueKind::from_byte(self.read_u8()?)?;
                let value_kind = ValueKind::from_byte(self.read_u8()?)?;
                let n = self.read_count()?;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let k = self.read_body(key_kind, depth + 1)?;
                    let v = self.read_body(value_kind, depth + 1)?;
                    entries.push((k, v));
                }
                ManifestValue::Map { key_kind,
                                     value_kind,
                                     entries }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_layout_is_kind_discriminator_count_fields() {
        let bytes = encode_value(&ManifestValue::enum_of(2, vec![ManifestValue::U8(9)])).unwrap();
        assert_eq!(bytes, vec![0x4d, 0x22, 2, 1, 0x07, 9]);
    }

    #[test]
    fn length_wider_than_usize_is_rejected() {
        let mut widest = vec![PAYLOAD_PREFIX];
        widest.extend([0xff; 9]);
        widest.push(0x01);
        assert_eq!(Decoder::new(&widest).unwrap().read_len().unwrap(), usize::MAX);

        let mut too_wide = vec![PAYLOAD_PREFIX];
        too_wide.extend([0xff; 9]);
        too_wide.push(0x7f);
        assert_eq!(Decoder::new(&too_wide).unwrap().read_len(), Err(ManifestError::LengthOverflow));

        let mut string = vec![PAYLOAD_PREFIX, ValueKind::String as u8];
        string.extend(&too_wide[1..]);
        assert_eq!(decode_value(&string), Err(ManifestError::LengthOverflow));
    }

    #[test]
    fn decimal_is_sign_extended_to_24_bytes() {
        let bytes = encode_value(&ManifestValue::Decimal("-1".parse().unwrap())).unwrap();
        assert_eq!(bytes.len(), 2 + 24);
        assert!(bytes[18..].iter().all(|b| *b == 0xff));
        assert_eq!(decode_value(&bytes).unwrap(), ManifestValue::Decimal("-1".parse().unwrap()));
    }

    #[test]
    fn long_lengths_use_multi_byte_varints() {
        let s = "x".repeat(300);
        let bytes = encode_value(&ManifestValue::String(s.clone())).unwrap();
        assert_eq!(&bytes[2..4], &[0xac, 0x02]);
        assert_eq!(decode_value(&bytes).unwrap(), ManifestValue::String(s));
    }

    #[test]
    fn heterogeneous_array_is_rejected_on_encode() {
        let bad = ManifestValue::array(ValueKind::U8, vec![ManifestValue::U8(1), ManifestValue::Bool(true)]);
        assert!(matches!(encode_value(&bad), Err(ManifestError::MismatchedArrayElement { .. })));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert_eq!(decode_value(&[]), Err(ManifestError::UnexpectedEof));
        assert_eq!(decode_value(&[0x5c, 0x01, 0x01]), Err(ManifestError::InvalidPrefix(0x5c)));
        assert_eq!(decode_value(&[0x4d, 0x99]), Err(ManifestError::UnknownValueKind(0x99)));
        assert_eq!(decode_value(&[0x4d, 0x01, 0x01, 0x00]), Err(ManifestError::TrailingBytes(1)));
        assert_eq!(decode_value(&[0x4d, 0x0c, 0x02, 0xff, 0xfe]), Err(ManifestError::InvalidUtf8));
        assert_eq!(decode_value(&[0x4d, 0x21, 0x05, 0x07]), Err(ManifestError::UnexpectedEof));
    }

    #[test]
    fn nesting_beyond_limit_fails() {
        let mut value = ManifestValue::U8(0);
        for _ in 0..(MAX_DEPTH + 2) {
            value = ManifestValue::Tuple(vec![value]);
        }
        assert_eq!(encode_value(&value), Err(ManifestError::MaxDepthExceeded));
    }
}
