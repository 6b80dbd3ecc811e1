//! Hashing determinista: JSON canónico, hash de strings y claves de idempotencia.

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value, idempotency_key};
