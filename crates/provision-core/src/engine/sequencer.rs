//! Sequencer: recorre el plan en orden, saltea lo que el checkpoint ya tiene y
//! ejecuta el resto de a un step por vez.

use std::collections::HashMap;

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use provision_gateway::{Account, GatewayClient, GatewayError, IntentHash, TransactionStatus};
use provision_manifest::render_manifest;
use uuid::Uuid;

use super::{BuildEnv, PollPolicy, RunContext, RunReport, StepContext};
use crate::checkpoint::{Checkpoint, CheckpointSession, CheckpointStore};
use crate::errors::CoreEngineError;
use crate::event::{EventStore, RunEventKind};
use crate::hashing::idempotency_key;
use crate::plan::ProvisionPlan;
use crate::step::{OutputBinding, StepDefinition, StepStatus};

/// Intent de una corrida anterior sin commit registrado.
#[derive(Debug, Clone)]
struct PendingIntent {
    intent: IntentHash,
    valid_until: i64,
}

/// Orquestador de una corrida.
///
/// Una sola corrida por red a la vez: dos corridas concurrentes sobre el mismo
/// checkpoint pueden decidir ambas que un step está pendiente y ejecutarlo dos
/// veces. Garantizarlo es responsabilidad de quien invoca.
pub struct Sequencer<'a> {
    gateway: &'a dyn GatewayClient,
    account: &'a Account,
    store: &'a dyn CheckpointStore,
    journal: &'a dyn EventStore,
    poll: PollPolicy,
}

fn gateway_error(step: &str, err: GatewayError) -> CoreEngineError {
    CoreEngineError::Gateway { step: step.to_string(),
                               message: err.to_string() }
}

impl<'a> Sequencer<'a> {
    pub fn new(gateway: &'a dyn GatewayClient,
               account: &'a Account,
               store: &'a dyn CheckpointStore,
               journal: &'a dyn EventStore)
               -> Self {
        Self { gateway,
               account,
               store,
               journal,
               poll: PollPolicy::default() }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Ejecuta el plan.
    ///
    /// Devuelve `Err` sólo si la corrida no pudo empezar: checkpoint ilegible,
    /// inputs externos ausentes o un step con parte de sus outputs ya escritos.
    /// En ese último caso no se envía nada; el checkpoint hay que repararlo a mano. Un fallo de step detiene la corrida y queda en
    /// `RunReport::failure`; lo ya comprometido está escrito en el checkpoint.
    pub async fn run(&self, ctx: &RunContext, plan: &ProvisionPlan) -> Result<RunReport, CoreEngineError> {
        let network = ctx.network_name();
        let run_id = Uuid::new_v4();
        let mut session = CheckpointSession::open(self.store, network)?;

        let mut statuses: IndexMap<String, StepStatus> = IndexMap::new();
        for step in plan.ordered() {
            let done = step.outputs().iter().all(|k| session.checkpoint().contains(k));
            statuses.insert(step.id().to_string(), if done { StepStatus::Satisfied } else { StepStatus::Pending });
        }
        for step in plan.ordered().filter(|s| statuses.get(s.id()) == Some(&StepStatus::Pending)) {
            let (present, missing): (Vec<String>, Vec<String>) =
                step.outputs().into_iter().partition(|k| session.checkpoint().contains(k));
            if !present.is_empty() {
                error!("run:partial_outputs network={network} step={} present={present:?} missing={missing:?}",
                       step.id());
                return Err(CoreEngineError::PartialOutputs { step: step.id().to_string(),
                                                             present,
                                                             missing });
            }
            if let Some(key) = step.reads()
                                   .into_iter()
                                   .find(|k| !plan.produces(k) && !session.checkpoint().contains(k))
            {
                error!("run:missing_input network={network} step={} key={key}", step.id());
                return Err(CoreEngineError::MissingInput { step: step.id().to_string(),
                                                           key });
            }
        }

        let state_version = match self.gateway.get_state_version().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("run:state_version unavailable err={e}");
                None
            }
        };
        self.journal.append_kind(run_id,
                                 RunEventKind::RunStarted { network: network.to_string(),
                                                            definition_hash: plan.definition_hash().to_string(),
                                                            step_count: plan.len(),
                                                            state_version })?;
        let pending_intents = self.pending_intents(plan, network)?;
        info!("run:start run_id={run_id} network={network} steps={} pending={} state_version={state_version:?}",
              plan.len(),
              statuses.values().filter(|s| **s == StepStatus::Pending).count());

        let mut report = RunReport { run_id,
                                     statuses: IndexMap::new(),
                                     submissions: 0,
                                     recovered: Vec::new(),
                                     failure: None,
                                     checkpoint: Checkpoint::new(network) };

        for step in plan.ordered() {
            let step_id = step.id().to_string();
            if statuses.get(&step_id) == Some(&StepStatus::Satisfied) {
                debug!("step:skip step={step_id}");
                if let Err(e) = self.journal.append_kind(run_id, RunEventKind::StepSkipped { step_id }) {
                    warn!("journal:append failed kind=StepSkipped err={e}");
                }
                continue;
            }

            statuses.insert(step_id.clone(), StepStatus::Executing);
            let key = idempotency_key(network, plan.definition_hash(), &step_id);
            let pending = pending_intents.get(&step_id);
            match self.execute(run_id, ctx, plan, step, &key, pending, &mut session, &mut report).await {
                Ok(()) => {
                    statuses.insert(step_id, StepStatus::Committed);
                }
                Err(err) => {
                    error!("step:failed step={step_id} err={err}");
                    statuses.insert(step_id.clone(), StepStatus::Failed);
                    if let Err(e) = self.journal.append_kind(run_id,
                                                             RunEventKind::StepFailed { step_id,
                                                                                        error: err.clone() })
                    {
                        warn!("journal:append failed kind=StepFailed err={e}");
                    }
                    report.failure = Some(err);
                    break;
                }
            }
        }

        report.statuses = statuses;
        let last_known = session.checkpoint().clone();
        report.checkpoint = match session.finish() {
            Ok(cp) => cp,
            Err(e) => {
                error!("checkpoint:final flush failed network={network} err={e}");
                report.failure.get_or_insert(e);
                last_known
            }
        };
        let committed = report.committed().len();
        if let Err(e) = self.journal.append_kind(run_id,
                                                 RunEventKind::RunFinished { committed,
                                                                             failed: report.failure.is_some() })
        {
            warn!("journal:append failed kind=RunFinished err={e}");
        }
        info!("run:done run_id={run_id} network={network} committed={committed} submissions={} recovered={} failed={}",
              report.submissions,
              report.recovered.len(),
              report.failure.is_some());
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(&self,
                     run_id: Uuid,
                     ctx: &RunContext,
                     plan: &ProvisionPlan,
                     step: &dyn StepDefinition,
                     key: &str,
                     pending: Option<&PendingIntent>,
                     session: &mut CheckpointSession<'_>,
                     report: &mut RunReport)
                     -> Result<(), CoreEngineError> {
        let step_id = step.id();
        self.journal.append_kind(run_id,
                                 RunEventKind::StepStarted { step_id: step_id.to_string(),
                                                             idempotency_key: key.to_string() })?;
        info!("step:start step={step_id}");

        let recovered = match pending {
            Some(p) => self.recover(step_id, p).await?,
            None => None,
        };
        let (intent, was_recovered) = match recovered {
            Some(intent) => (intent, true),
            None => (self.submit(run_id, ctx, plan, step, key, session.checkpoint(), report).await?, false),
        };

        let outputs = self.bind(step, &intent).await?;
        session.commit(step_id, &outputs)?;
        if was_recovered {
            report.recovered.push(step_id.to_string());
            self.journal.append_kind(run_id,
                                     RunEventKind::StepRecovered { step_id: step_id.to_string(),
                                                                   intent: intent.as_str().to_string() })?;
        }
        self.journal.append_kind(run_id,
                                 RunEventKind::StepCommitted { step_id: step_id.to_string(),
                                                               intent: intent.as_str().to_string(),
                                                               outputs: outputs.clone() })?;
        for (k, v) in &outputs {
            info!("step:output step={step_id} {k}={v}");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn submit(&self,
                    run_id: Uuid,
                    ctx: &RunContext,
                    plan: &ProvisionPlan,
                    step: &dyn StepDefinition,
                    key: &str,
                    checkpoint: &Checkpoint,
                    report: &mut RunReport)
                    -> Result<IntentHash, CoreEngineError> {
        let step_id = step.id();
        let step_ctx = StepContext { step_id,
                                     run: ctx,
                                     checkpoint,
                                     build_env: BuildEnv::from_checkpoint(ctx.network_id, &plan.output_keys(), checkpoint) };
        let manifest = step.prepare(&step_ctx).await?;
        debug!("step:manifest step={step_id} instructions={}\n{}", manifest.len(), render_manifest(&manifest));

        let tx = self.gateway
                     .build_transaction(&manifest, self.account)
                     .await
                     .map_err(|e| gateway_error(step_id, e))?;
        // El journal va antes del envío: si el proceso muere después de
        // enviar, la próxima corrida encuentra el intent y lo reconcilia.
        self.journal.append_kind(run_id,
                                 RunEventKind::IntentSubmitted { step_id: step_id.to_string(),
                                                                 idempotency_key: key.to_string(),
                                                                 intent: tx.intent.as_str().to_string(),
                                                                 valid_until: tx.valid_until })?;
        self.gateway
            .submit_transaction(&tx)
            .await
            .map_err(|e| gateway_error(step_id, e))?;
        report.submissions += 1;
        info!("step:submitted step={step_id} intent={}", tx.intent);

        match self.await_terminal(step_id, &tx.intent, None).await? {
            Some(TransactionStatus::Success) => Ok(tx.intent),
            Some(TransactionStatus::Failed { reason }) => Err(CoreEngineError::TransactionFailed { step: step_id.to_string(),
                                                                                                  intent: tx.intent.to_string(),
                                                                                                  reason }),
            Some(TransactionStatus::Pending) | None => {
                Err(CoreEngineError::Internal(format!("poll for {} ended without terminal status", tx.intent)))
            }
        }
    }

    /// `Some(intent)` si el intent anterior se comprometió con éxito.
    ///
    /// El intent quedó en el journal antes del envío. Si `submit_transaction`
    /// falló a nivel HTTP el ledger puede no haberlo visto nunca: la consulta
    /// sigue pendiente hasta `valid_until` y recién ahí el step se ejecuta de nuevo.
    async fn recover(&self, step_id: &str, pending: &PendingIntent) -> Result<Option<IntentHash>, CoreEngineError> {
        info!("step:recover step={step_id} intent={}", pending.intent);
        match self.await_terminal(step_id, &pending.intent, Some(pending.valid_until)).await? {
            Some(TransactionStatus::Success) => Ok(Some(pending.intent.clone())),
            Some(TransactionStatus::Failed { reason }) => {
                warn!("step:recover previous intent failed step={step_id} reason={reason}; executing again");
                Ok(None)
            }
            Some(TransactionStatus::Pending) | None => {
                warn!("step:recover previous intent expired step={step_id}; executing again");
                Ok(None)
            }
        }
    }

    async fn bind(&self, step: &dyn StepDefinition, intent: &IntentHash) -> Result<Vec<(String, String)>, CoreEngineError> {
        let outputs = step.outputs();
        match step.binding() {
            OutputBinding::IntentHash => Ok(outputs.into_iter().map(|k| (k, intent.to_string())).collect()),
            OutputBinding::NewEntities => {
                let addresses = self.gateway
                                    .get_new_addresses(intent)
                                    .await
                                    .map_err(|e| gateway_error(step.id(), e))?;
                if addresses.len() < outputs.len() {
                    return Err(CoreEngineError::OutputMismatch { step: step.id().to_string(),
                                                                 expected: outputs.len(),
                                                                 found: addresses.len() });
                }
                if addresses.len() > outputs.len() {
                    debug!("step:bind step={} unbound_addresses={}", step.id(), addresses.len() - outputs.len());
                }
                Ok(outputs.into_iter()
                          .zip(addresses)
                          .map(|(k, a)| (k, a.to_string()))
                          .collect())
            }
        }
    }

    /// Consulta el estado hasta que sea terminal.
    ///
    /// Con `expires_at`, un intent que sigue pendiente después de su ventana de
    /// validez se reporta como `None`: ya no puede comprometerse.
    async fn await_terminal(&self,
                            step_id: &str,
                            intent: &IntentHash,
                            expires_at: Option<i64>)
                            -> Result<Option<TransactionStatus>, CoreEngineError> {
        let started = tokio::time::Instant::now();
        let mut polls: u64 = 0;
        loop {
            let status = self.gateway
                             .get_transaction_status(intent)
                             .await
                             .map_err(|e| gateway_error(step_id, e))?;
            if status.is_terminal() {
                debug!("step:status step={step_id} intent={intent} status={status:?} polls={polls}");
                return Ok(Some(status));
            }
            if expires_at.is_some_and(|until| Utc::now().timestamp() >= until) {
                return Ok(None);
            }
            if let Some(timeout) = self.poll.timeout {
                if started.elapsed() >= timeout {
                    return Err(CoreEngineError::StatusTimeout { step: step_id.to_string(),
                                                                intent: intent.to_string() });
                }
            }
            polls += 1;
            if polls % 30 == 0 {
                info!("step:waiting step={step_id} intent={intent} polls={polls}");
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    /// Intents enviados con la clave de idempotencia vigente y sin commit ni
    /// fallo terminal registrado.
    fn pending_intents(&self, plan: &ProvisionPlan, network: &str) -> Result<HashMap<String, PendingIntent>, CoreEngineError> {
        let keys: HashMap<String, String> =
            plan.ordered()
                .map(|s| (s.id().to_string(), idempotency_key(network, plan.definition_hash(), s.id())))
                .collect();
        let mut pending = HashMap::new();
        let events = self.journal.list()?;
        for ev in events.into_iter()
                        .filter(|ev| ev.kind.step_id().is_some_and(|id| keys.contains_key(id)))
        {
            match ev.kind {
                RunEventKind::IntentSubmitted { step_id,
                                                idempotency_key,
                                                intent,
                                                valid_until, }
                    if keys.get(&step_id) == Some(&idempotency_key) =>
                {
                    pending.insert(step_id,
                                   PendingIntent { intent: IntentHash(intent),
                                                   valid_until });
                }
                RunEventKind::StepCommitted { step_id, .. }
                | RunEventKind::StepFailed { step_id,
                                             error: CoreEngineError::TransactionFailed { .. }, } => {
                    pending.remove(&step_id);
                }
                _ => {}
            }
        }
        if !pending.is_empty() {
            warn!("run:unreconciled_intents network={network} steps={:?}", pending.keys().collect::<Vec<_>>());
        }
        Ok(pending)
    }
}
