use async_trait::async_trait;
use provision_manifest::Manifest;

use crate::engine::StepContext;
use crate::errors::CoreEngineError;

/// Cómo se ligan los outputs declarados al recibo de la transacción.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBinding {
    /// Posicional: output `i` recibe la dirección nueva `i`, en orden de creación.
    NewEntities,
    /// El único output recibe el hash del intent (transacciones sin entidades nuevas).
    IntentHash,
}

/// Unidad de aprovisionamiento. `prepare` no debe tener efectos sobre el
/// ledger: sólo construye el manifiesto a partir del contexto.
#[async_trait]
pub trait StepDefinition: Send + Sync {
    /// Identificador estable y único dentro del plan.
    fn id(&self) -> &str;

    /// Claves de output, en el orden en que se ligan.
    fn outputs(&self) -> Vec<String>;

    /// Claves del checkpoint que `prepare` lee.
    fn reads(&self) -> Vec<String> {
        Vec::new()
    }

    fn binding(&self) -> OutputBinding {
        OutputBinding::NewEntities
    }

    async fn prepare(&self, ctx: &StepContext<'_>) -> Result<Manifest, CoreEngineError>;
}
