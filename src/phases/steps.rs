//! Tipos de step reutilizados por todas las fases.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use provision_core::{CoreEngineError, OutputBinding, StepContext, StepDefinition};
use provision_manifest::{AccessRule, Decimal, Manifest, ManifestBuilder, MetadataConfig, OwnerRole};
use provision_toolchain::ArtifactBuilder;

use super::keys::OWNER_RESOURCE;

/// Badges de owner exigidos por el rol de owner de paquetes y componentes.
pub const OWNER_BADGE_AMOUNT: i64 = 4;

pub type ManifestFn = Box<dyn Fn(&StepContext<'_>) -> Result<Manifest, CoreEngineError> + Send + Sync>;

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// `Updatable(AmountOf(4, OWNER_RESOURCE))`.
pub fn protocol_owner_role(ctx: &StepContext<'_>) -> Result<OwnerRole, CoreEngineError> {
    let owner = ctx.address(OWNER_RESOURCE)?;
    Ok(OwnerRole::Updatable(AccessRule::require_amount(Decimal::from_int(OWNER_BADGE_AMOUNT), owner)))
}

/// Step cuyo manifiesto sale de una función pura del contexto.
pub struct TransactionStep {
    id: String,
    outputs: Vec<String>,
    reads: Vec<String>,
    binding: OutputBinding,
    build: ManifestFn,
}

impl TransactionStep {
    /// Outputs ligados por posición a las direcciones nuevas.
    pub fn creating<F>(id: &str, outputs: &[&str], reads: &[&str], build: F) -> Self
        where F: Fn(&StepContext<'_>) -> Result<Manifest, CoreEngineError> + Send + Sync + 'static
    {
        Self { id: id.to_string(),
               outputs: owned(outputs),
               reads: owned(reads),
               binding: OutputBinding::NewEntities,
               build: Box::new(build) }
    }

    /// Transacción sin entidades nuevas: se registra el intent hash.
    pub fn recording<F>(id: &str, output: &str, reads: &[&str], build: F) -> Self
        where F: Fn(&StepContext<'_>) -> Result<Manifest, CoreEngineError> + Send + Sync + 'static
    {
        Self { id: id.to_string(),
               outputs: vec![output.to_string()],
               reads: owned(reads),
               binding: OutputBinding::IntentHash,
               build: Box::new(build) }
    }
}

#[async_trait]
impl StepDefinition for TransactionStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn outputs(&self) -> Vec<String> {
        self.outputs.clone()
    }

    fn reads(&self) -> Vec<String> {
        self.reads.clone()
    }

    fn binding(&self) -> OutputBinding {
        self.binding
    }

    async fn prepare(&self, ctx: &StepContext<'_>) -> Result<Manifest, CoreEngineError> {
        (self.build)(ctx)
    }
}

/// Owner del paquete publicado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOwner {
    None,
    /// Requiere los badges de owner del protocolo.
    Protocol,
}

/// Compila un componente y publica el paquete resultante.
pub struct PublishStep {
    id: String,
    component: String,
    output: String,
    reads: Vec<String>,
    owner: PackageOwner,
    fee: Decimal,
    builder: Arc<dyn ArtifactBuilder>,
}

impl PublishStep {
    pub fn new(component: &str,
               output: &str,
               reads: &[&str],
               owner: PackageOwner,
               fee: Decimal,
               builder: Arc<dyn ArtifactBuilder>)
               -> Self {
        let mut reads = owned(reads);
        if owner == PackageOwner::Protocol && !reads.iter().any(|k| k == OWNER_RESOURCE) {
            reads.push(OWNER_RESOURCE.to_string());
        }
        Self { id: format!("publish_{component}"),
               component: component.to_string(),
               output: output.to_string(),
               reads,
               owner,
               fee,
               builder }
    }
}

#[async_trait]
impl StepDefinition for PublishStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn reads(&self) -> Vec<String> {
        self.reads.clone()
    }

    async fn prepare(&self, ctx: &StepContext<'_>) -> Result<Manifest, CoreEngineError> {
        let owner_role = match self.owner {
            PackageOwner::None => OwnerRole::None,
            PackageOwner::Protocol => protocol_owner_role(ctx)?,
        };
        let archive_dir = ctx.run.archive_dir();
        let artifacts = self.builder.build(&self.component, &ctx.build_env, &archive_dir).await?;
        info!("publish:artifacts component={} code_sha256={}", self.component, artifacts.code_sha256());
        Ok(ManifestBuilder::new().lock_fee(ctx.account(), self.fee)
                                 .publish_package(artifacts.code, artifacts.definition, owner_role, MetadataConfig::new())
                                 .deposit_all(ctx.account())
                                 .build())
    }
}
