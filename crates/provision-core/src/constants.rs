//! Constantes del motor de aprovisionamiento.

/// Versión lógica del sequencer. Forma parte del hash de definición del plan,
/// y por lo tanto de las claves de idempotencia: cambiarla invalida la
/// recuperación de intents de corridas anteriores.
pub const ENGINE_VERSION: &str = "P1.0";

/// Clave de entorno con el id de red que recibe el toolchain.
pub const NETWORK_ID_ENV: &str = "NETWORK_ID";
