use blake3::Hasher;
use serde_json::Value;

use super::to_canonical_json;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

/// Clave estable por (red, definición del plan, step).
///
/// Misma red y mismo plan producen siempre la misma clave para un step; la
/// recuperación de intents sólo acepta entradas del journal con clave igual.
pub fn idempotency_key(network: &str, definition_hash: &str, step_id: &str) -> String {
    let mut h = Hasher::new();
    for part in [network, definition_hash, step_id] {
        h.update(&(part.len() as u64).to_le_bytes());
        h.update(part.as_bytes());
    }
    h.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_depends_on_every_part() {
        let base = idempotency_key("stokenet", "h1", "owner");
        assert_eq!(base, idempotency_key("stokenet", "h1", "owner"));
        assert_ne!(base, idempotency_key("mainnet", "h1", "owner"));
        assert_ne!(base, idempotency_key("stokenet", "h2", "owner"));
        assert_ne!(base, idempotency_key("stokenet", "h1", "authority"));
        // Los límites entre partes no son ambiguos.
        assert_ne!(idempotency_key("ab", "c", "d"), idempotency_key("a", "bc", "d"));
    }
}
