//! Journal de eventos de corrida y trait EventStore.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventLog};
pub use types::{RunEvent, RunEventKind};
