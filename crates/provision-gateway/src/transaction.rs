//! Sobre de transacción: header + manifiesto, hash de intent y firma del notario.
//!
//! Layout del payload notarizado:
//!
//! ```text
//! 0x4d | version(1) | len(u32 LE) | intent bytes | firma ed25519 (64)
//! intent bytes = len(u32 LE) | header (valor codificado) | manifiesto codificado
//! ```
//!
//! El hash del intent es blake3 sobre los intent bytes y es lo que firma el
//! notario.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use provision_manifest::codec::PAYLOAD_PREFIX;
use provision_manifest::{decode_manifest, decode_value, encode_manifest, encode_value, Manifest, ManifestValue, ValueKind};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::GatewayError;

pub const PAYLOAD_VERSION: u8 = 1;

/// Identificador opaco devuelto al construir la transacción.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentHash(pub String);

impl IntentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IntentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txid_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub network_id: u8,
    /// Ventana de validez en segundos unix, `[valid_from, valid_until)`.
    pub valid_from: i64,
    pub valid_until: i64,
    pub nonce: u32,
    pub notary_public_key: [u8; 32],
}

impl TransactionHeader {
    fn to_value(&self) -> ManifestValue {
        ManifestValue::Tuple(vec![ManifestValue::U8(self.network_id),
                                  ManifestValue::I64(self.valid_from),
                                  ManifestValue::I64(self.valid_until),
                                  ManifestValue::U32(self.nonce),
                                  ManifestValue::array(ValueKind::U8,
                                                       self.notary_public_key.iter().copied().map(ManifestValue::U8).collect())])
    }

    fn from_value(value: &ManifestValue) -> Result<Self, GatewayError> {
        let fields = value.as_tuple()?;
        let [network_id, valid_from, valid_until, nonce, key] = fields else {
            return Err(GatewayError::InvalidPayload(format!("header has {} fields", fields.len())));
        };
        let i64_of = |v: &ManifestValue| match v {
            ManifestValue::I64(x) => Ok(*x),
            _ => Err(GatewayError::InvalidPayload("validity bound is not i64".into())),
        };
        let key_bytes = key.as_array()?
                           .iter()
                           .map(|b| b.as_u8())
                           .collect::<Result<Vec<u8>, _>>()?;
        let notary_public_key: [u8; 32] =
            key_bytes.as_slice()
                     .try_into()
                     .map_err(|_| GatewayError::InvalidPayload(format!("notary key has {} bytes", key_bytes.len())))?;
        Ok(Self { network_id: network_id.as_u8()?,
                  valid_from: i64_of(valid_from)?,
                  valid_until: i64_of(valid_until)?,
                  nonce: nonce.as_u32()?,
                  notary_public_key })
    }
}

/// Transacción firmada, lista para enviar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub payload: Vec<u8>,
    pub intent: IntentHash,
    /// Fin de la ventana de validez (unix). Pasado este instante el intent ya no puede comprometerse.
    pub valid_until: i64,
}

impl SignedTransaction {
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }
}

/// Resultado de decodificar un payload notarizado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub header: TransactionHeader,
    pub manifest: Manifest,
    pub intent: IntentHash,
}

/// Nonce derivado del contenido del manifiesto: mismo manifiesto, mismo nonce.
pub fn manifest_nonce(manifest_bytes: &[u8]) -> u32 {
    let hash = blake3::hash(manifest_bytes);
    let b = hash.as_bytes();
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn intent_bytes(header: &TransactionHeader, manifest_bytes: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let header_bytes = encode_value(&header.to_value())?;
    let mut out = Vec::with_capacity(4 + header_bytes.len() + manifest_bytes.len());
    out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(manifest_bytes);
    Ok(out)
}

fn hash_intent(bytes: &[u8]) -> IntentHash {
    IntentHash(blake3::hash(bytes).to_hex().to_string())
}

/// Construye y firma localmente. Función pura de sus entradas más `now`.
pub fn build_signed_transaction(manifest: &Manifest,
                                account: &Account,
                                network_id: u8,
                                now: DateTime<Utc>,
                                validity: Duration)
                                -> Result<SignedTransaction, GatewayError> {
    let manifest_bytes = encode_manifest(manifest)?;
    let header = TransactionHeader { network_id,
                                     valid_from: now.timestamp(),
                                     valid_until: (now + validity).timestamp(),
                                     nonce: manifest_nonce(&manifest_bytes),
                                     notary_public_key: account.public_key().to_bytes() };
    let intent = intent_bytes(&header, &manifest_bytes)?;
    let intent_hash = blake3::hash(&intent);
    let signature = account.sign(intent_hash.as_bytes());

    let mut payload = Vec::with_capacity(2 + 4 + intent.len() + 64);
    payload.push(PAYLOAD_PREFIX);
    payload.push(PAYLOAD_VERSION);
    payload.extend_from_slice(&(intent.len() as u32).to_le_bytes());
    payload.extend_from_slice(&intent);
    payload.extend_from_slice(&signature.to_bytes());
    Ok(SignedTransaction { payload,
                           intent: hash_intent(&intent),
                           valid_until: header.valid_until })
}

fn split_len_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8]), GatewayError> {
    let short = || GatewayError::InvalidPayload("truncated payload".into());
    let len_bytes: [u8; 4] = bytes.get(..4).ok_or_else(short)?.try_into().map_err(|_| short())?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let body = bytes.get(4..4 + len).ok_or_else(short)?;
    Ok((body, &bytes[4 + len..]))
}

/// Decodifica un payload notarizado, verifica firma y recalcula el hash del intent.
pub fn decode_notarized_transaction(payload: &[u8]) -> Result<DecodedTransaction, GatewayError> {
    match payload {
        [PAYLOAD_PREFIX, PAYLOAD_VERSION, ..] => {}
        _ => return Err(GatewayError::InvalidPayload("unknown payload prefix or version".into())),
    }
    let (intent, rest) = split_len_prefixed(&payload[2..])?;
    let signature_bytes: [u8; 64] = rest.try_into()
                                        .map_err(|_| GatewayError::InvalidPayload(format!("signature has {} bytes", rest.len())))?;

    let (header_bytes, manifest_bytes) = split_len_prefixed(intent)?;
    let header = TransactionHeader::from_value(&decode_value(header_bytes)?)?;
    let manifest = decode_manifest(manifest_bytes)?;

    let key = VerifyingKey::from_bytes(&header.notary_public_key).map_err(|_| GatewayError::BadSignature)?;
    let signature = Signature::from_bytes(&signature_bytes);
    key.verify(blake3::hash(intent).as_bytes(), &signature)
       .map_err(|_| GatewayError::BadSignature)?;

    Ok(DecodedTransaction { header,
                            manifest,
                            intent: hash_intent(intent) })
}
