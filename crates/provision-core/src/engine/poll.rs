use std::time::Duration;

/// Política de espera de estado terminal.
///
/// Sin `timeout` la espera no tiene límite: una transacción que nunca llega a
/// estado terminal bloquea la corrida hasta que el proceso se termine desde
/// afuera. Es una decisión de configuración, no un descuido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self { interval,
               timeout: None }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout: Some(timeout),
               ..self }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(2))
    }
}
