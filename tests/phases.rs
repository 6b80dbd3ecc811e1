//! Fases completas contra el ledger simulado.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ledger_provision::phases::bootstrap::{bootstrap_plan, BootstrapSettings};
use ledger_provision::phases::dapp_definition::{dapp_definition_plan, DappDefinitionSettings};
use ledger_provision::phases::keeper::{fill_keeper_plan, KeeperSettings};
use ledger_provision::phases::keys::*;
use ledger_provision::phases::smoke::{smoke_plan, SmokeSettings};
use ledger_provision::{FundingPolicy, Phase, PhaseRunner, ProvisionError};
use provision_core::{BuildEnv, Checkpoint, CheckpointStore, CoreEngineError, InMemoryCheckpointStore, InMemoryEventLog, PollPolicy,
                     StepStatus};
use provision_gateway::{synthetic_address, Account, MockGateway, Network, ScriptedOutcome, ScriptedResult};
use provision_manifest::{Decimal, EntityKind, Instruction};
use provision_persistence::{FileEventLog, JsonCheckpointStore};
use provision_toolchain::{Artifacts, ArtifactBuilder, BuildError};
use uuid::Uuid;

/// Builder falso: registra el entorno de cada compilación.
#[derive(Default)]
struct RecordingBuilder {
    builds: Mutex<Vec<(String, BuildEnv)>>,
}

impl RecordingBuilder {
    fn builds(&self) -> Vec<(String, BuildEnv)> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactBuilder for RecordingBuilder {
    async fn build(&self, component: &str, env: &BuildEnv, _archive_dir: &Path) -> Result<Artifacts, BuildError> {
        self.builds.lock().unwrap().push((component.to_string(), env.clone()));
        Ok(Artifacts { component: component.to_string(),
                       code: format!("wasm:{component}").into_bytes(),
                       definition: format!("rpd:{component}").into_bytes() })
    }
}

fn account(network: Network) -> Account {
    Account::from_hex(&"2a".repeat(32), synthetic_address(EntityKind::Account, network, 7)).unwrap()
}

fn fast() -> PollPolicy {
    PollPolicy::unbounded(Duration::from_millis(1))
}

fn runner<'a>(gateway: &'a MockGateway, account: &'a Account, releases: &Path) -> PhaseRunner<'a> {
    PhaseRunner::new(gateway, account, releases).with_poll_policy(fast())
                                                 .with_funding(FundingPolicy::new(Decimal::from_int(1_000)).with_poll_interval(Duration::from_millis(1)))
}

fn temp_root() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ledger-provision-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn bootstrap_settings(test_network: bool) -> BootstrapSettings {
    BootstrapSettings { fee: Phase::Bootstrap.default_fee(),
                        oracle_public_key: "ab".repeat(32),
                        test_network }
}

/// El faucet del protocolo crea cuatro entidades con una sola llamada.
fn script_stokenet_bootstrap(gateway: &MockGateway) {
    for _ in 0..5 {
        gateway.script(ScriptedOutcome { result: ScriptedResult::Success(None),
                                         pending_polls: 0 });
    }
    let net = Network::Stokenet;
    gateway.script_success(vec![synthetic_address(EntityKind::Component, net, 9001),
                                synthetic_address(EntityKind::Resource, net, 9002),
                                synthetic_address(EntityKind::Resource, net, 9003),
                                synthetic_address(EntityKind::Resource, net, 9004)]);
}

#[tokio::test]
async fn stokenet_bootstrap_runs_once_and_then_skips_everything() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let builder = Arc::new(RecordingBuilder::default());
    let store = InMemoryCheckpointStore::new();
    let journal = InMemoryEventLog::new();
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root);
    script_stokenet_bootstrap(&gateway);

    let prep = phases.prepare(Phase::Bootstrap).await.unwrap();
    assert_eq!(prep.funding.polls, 0);
    assert!(prep.ctx.is_test_network());
    let plan = bootstrap_plan(&bootstrap_settings(true), builder.clone()).unwrap();
    let report = phases.execute(&prep.ctx, &plan, &store, &journal).await.unwrap();

    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.submissions, 12);
    assert_eq!(report.status("instantiate_faucet"), Some(StepStatus::Committed));
    let cp = store.stored("stokenet").unwrap();
    assert_eq!(cp.get(USDC_RESOURCE), Some(synthetic_address(EntityKind::Resource, Network::Stokenet, 9003).as_str()));
    assert!(cp.contains(ORACLE_COMPONENT));

    let builds = builder.builds();
    let components: Vec<&str> = builds.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(components, vec!["faucet", "keeper", "interest", "oracle"]);
    let (_, keeper_env) = &builds[1];
    assert_eq!(keeper_env.get("NETWORK_ID"), Some(gateway.config().network_id.to_string().as_str()));
    assert_eq!(keeper_env.get(OWNER_RESOURCE), cp.get(OWNER_RESOURCE));
    assert!(keeper_env.get(KEEPER_COMPONENT).is_none());
    assert_eq!(builds[3].1.get(INTEREST_COMPONENT), cp.get(INTEREST_COMPONENT));

    let again = phases.execute(&prep.ctx, &plan, &store, &journal).await.unwrap();
    assert_eq!(again.submissions, 0);
    assert!(again.statuses.values().all(|s| *s == StepStatus::Satisfied));
    assert_eq!(gateway.submission_count(), 12);
    assert_eq!(builder.builds().len(), 4);
}

#[tokio::test]
async fn mainnet_bootstrap_writes_checkpoint_files_under_the_run_archive() {
    let gateway = MockGateway::new(Network::Mainnet);
    let acct = account(Network::Mainnet);
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root.join("releases"));
    let prep = phases.prepare(Phase::Bootstrap).await.unwrap();

    let store = JsonCheckpointStore::new(root.join("deploy"), prep.ctx.archive_dir());
    let journal = FileEventLog::open(root.join("deploy/mainnet.journal.jsonl")).unwrap();
    let plan = bootstrap_plan(&bootstrap_settings(false), Arc::new(RecordingBuilder::default())).unwrap();
    let report = phases.execute(&prep.ctx, &plan, &store, &journal).await.unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.submissions, 10);

    let canonical: serde_json::Value = serde_json::from_slice(&fs::read(store.canonical_path("mainnet")).unwrap()).unwrap();
    assert_eq!(canonical.as_object().unwrap().len(), 10);
    assert!(canonical.get(FAUCET_COMPONENT).is_none());
    assert_eq!(fs::read(store.canonical_path("mainnet")).unwrap(), fs::read(store.archive_path("mainnet")).unwrap());
    assert!(store.archive_path("mainnet").starts_with(root.join("releases")));

    // Un proceso nuevo sobre los mismos archivos no vuelve a enviar nada.
    let store = JsonCheckpointStore::new(root.join("deploy"), prep.ctx.archive_dir());
    let journal = FileEventLog::open(root.join("deploy/mainnet.journal.jsonl")).unwrap();
    let again = phases.execute(&prep.ctx, &plan, &store, &journal).await.unwrap();
    assert_eq!(again.submissions, 0);
    assert_eq!(store.load("mainnet").unwrap().len(), 10);
}

#[tokio::test]
async fn dapp_definition_without_bootstrap_is_a_missing_input() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root);
    let prep = phases.prepare(Phase::DappDefinition).await.unwrap();

    let plan = dapp_definition_plan(&DappDefinitionSettings::new(Phase::DappDefinition.default_fee())).unwrap();
    let err = phases.execute(&prep.ctx, &plan, &InMemoryCheckpointStore::new(), &InMemoryEventLog::new())
                    .await
                    .unwrap_err();
    assert!(matches!(&err, ProvisionError::Core(CoreEngineError::MissingInput { key, .. }) if key == OWNER_RESOURCE));
    assert_eq!(err.exit_code() as i32, 3);
    assert_eq!(gateway.submission_count(), 0);
}

fn seeded(network: Network, keys: &[&str]) -> Checkpoint {
    let mut cp = Checkpoint::new(network.name());
    for (i, key) in keys.iter().enumerate() {
        let kind = if key.ends_with("_COMPONENT") { EntityKind::Component } else { EntityKind::Resource };
        cp.set(key, synthetic_address(kind, network, 500 + i as u64).as_str()).unwrap();
    }
    cp
}

#[tokio::test]
async fn dapp_definition_claims_the_protocol_entities() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root);
    let prep = phases.prepare(Phase::DappDefinition).await.unwrap();
    let store = InMemoryCheckpointStore::seed(seeded(Network::Stokenet,
                                                     &[OWNER_RESOURCE,
                                                       ORACLE_PACKAGE,
                                                       ORACLE_COMPONENT,
                                                       KEEPER_PACKAGE,
                                                       KEEPER_COMPONENT,
                                                       INTEREST_PACKAGE,
                                                       INTEREST_COMPONENT]));

    let plan = dapp_definition_plan(&DappDefinitionSettings::new(Phase::DappDefinition.default_fee())).unwrap();
    let report = phases.execute(&prep.ctx, &plan, &store, &InMemoryEventLog::new()).await.unwrap();
    assert!(report.is_success());

    let submitted = gateway.submissions();
    assert_eq!(submitted.len(), 1);
    let metadata_keys: Vec<&str> = submitted[0].manifest
                                               .instructions
                                               .iter()
                                               .filter_map(|i| match i {
                                                   Instruction::SetMetadata { key, .. } => Some(key.as_str()),
                                                   _ => None,
                                               })
                                               .collect();
    assert_eq!(metadata_keys,
               vec!["account_type", "name", "description", "icon_url", "claimed_entities", "claimed_websites"]);
    assert_eq!(store.stored("stokenet").unwrap().get(DAPP_DEFINITION_TX), Some(submitted[0].intent.to_string().as_str()));
}

#[tokio::test]
async fn fill_keeper_records_both_intents() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root);
    let prep = phases.prepare(Phase::FillKeeper).await.unwrap();
    let store = InMemoryCheckpointStore::seed(seeded(Network::Stokenet,
                                                     &[AUTHORITY_RESOURCE,
                                                       KEEPER_COMPONENT,
                                                       BASE_AUTHORITY_RESOURCE,
                                                       ORACLE_COMPONENT,
                                                       USDT_RESOURCE,
                                                       USDC_RESOURCE]));

    let validator = synthetic_address(EntityKind::Validator, Network::Stokenet, 42);
    let plan = fill_keeper_plan(&KeeperSettings::new(Phase::FillKeeper.default_fee(), validator).unwrap()).unwrap();
    let report = phases.execute(&prep.ctx, &plan, &store, &InMemoryEventLog::new()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.submissions, 2);

    let submitted = gateway.submissions();
    assert!(matches!(&submitted[0].manifest.instructions[2],
                     Instruction::CallMethod { method, .. } if method == "fill_validator_staking"));
    let quotes = submitted[1].manifest
                             .instructions
                             .iter()
                             .filter(|i| matches!(i, Instruction::CallMethod { method, .. } if method == "set_price_quote_in_xrd"))
                             .count();
    assert_eq!(quotes, 2);
    let cp = store.stored("stokenet").unwrap();
    assert_eq!(cp.get(KEEPER_STAKING_TX), Some(submitted[0].intent.to_string().as_str()));
    assert_eq!(cp.get(ORACLE_PRICES_TX), Some(submitted[1].intent.to_string().as_str()));
}

#[tokio::test]
async fn smoke_claims_test_tokens_before_moving_buckets() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let root = temp_root();
    let phases = runner(&gateway, &acct, &root);
    let prep = phases.prepare(Phase::Smoke).await.unwrap();
    let store = InMemoryCheckpointStore::seed(seeded(Network::Stokenet, &[FAUCET_COMPONENT, USDC_RESOURCE]));

    let plan = smoke_plan(&SmokeSettings { fee: Phase::Smoke.default_fee(),
                                           amount: Decimal::from_int(5),
                                           test_network: prep.ctx.is_test_network() }).unwrap();
    let report = phases.execute(&prep.ctx, &plan, &store, &InMemoryEventLog::new()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.committed(), vec!["smoke_faucet", "smoke_bucket"]);

    let submitted = gateway.submissions();
    let faucet = gateway.config().well_known.faucet.clone().unwrap();
    assert!(matches!(&submitted[0].manifest.instructions[0],
                     Instruction::CallMethod { address, method, .. } if *address == faucet && method == "lock_fee"));
    assert!(submitted[1].manifest
                        .instructions
                        .iter()
                        .any(|i| matches!(i, Instruction::TakeFromWorktop { .. })));
}

#[test]
fn phase_defaults_follow_the_deploy_scripts() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Stokenet);
    let phases = PhaseRunner::new(&gateway, &acct, "releases");
    let policy = phases.funding_policy(Phase::Bootstrap);
    assert_eq!(policy.threshold, Decimal::from_int(10_000));
    assert_eq!(policy.target, Decimal::from_int(30_000));
    assert_eq!(phases.funding_policy(Phase::Smoke).target, Decimal::from_int(1_000));
}

#[test]
fn prepare_rejects_an_account_from_another_network() {
    let gateway = MockGateway::stokenet();
    let acct = account(Network::Mainnet);
    let phases = PhaseRunner::new(&gateway, &acct, "releases");
    let err = tokio_test::block_on(phases.prepare(Phase::Smoke)).unwrap_err();
    assert_eq!(err.exit_code() as i32, 3);
    assert_eq!(gateway.submission_count(), 0);
}
