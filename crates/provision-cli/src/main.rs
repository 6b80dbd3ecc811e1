//! `provision`: despliegue por fases del protocolo.
//!
//! Cada subcomando es una fase re-ejecutable. La configuración sale del
//! entorno (y de `.env`); el estado de cada red vive en `DEPLOY_DIR`.

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ledger_provision::phases::bootstrap::{bootstrap_plan, BootstrapSettings};
use ledger_provision::phases::dapp_definition::{dapp_definition_plan, DappDefinitionSettings};
use ledger_provision::phases::keeper::{fill_keeper_plan, KeeperSettings};
use ledger_provision::phases::smoke::{smoke_plan, SmokeSettings};
use ledger_provision::{Phase, PhaseRunner, ProvisionConfig, ProvisionError};
use log::{error, info};
use provision_core::{ProvisionPlan, RunContext};
use provision_gateway::HttpGateway;
use provision_manifest::{Address, Decimal};
use provision_persistence::{FileEventLog, JsonCheckpointStore};
use provision_toolchain::ScryptoToolchain;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "provision", version, about = "Despliegue por fases del protocolo sobre el ledger")]
struct Cli {
    /// -v para debug, -vv para trace
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Badges, recurso base, paquetes y componentes del protocolo.
    Bootstrap,
    /// Registra la cuenta como dApp definition.
    DappDefinition,
    /// Historial de staking del validador y precios iniciales del oráculo.
    FillKeeper {
        /// Sobrescribe VALIDATOR_ADDRESS.
        #[arg(long)]
        validator: Option<String>,
    },
    /// Transacciones de humo contra lo ya desplegado.
    Smoke {
        #[arg(long, default_value = "1")]
        amount: String,
    },
}

impl Command {
    fn phase(&self) -> Phase {
        match self {
            Command::Bootstrap => Phase::Bootstrap,
            Command::DappDefinition => Phase::DappDefinition,
            Command::FillKeeper { .. } => Phase::FillKeeper,
            Command::Smoke { .. } => Phase::Smoke,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(&cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            error!("provision:failed phase={} err={e}", cli.command.phase().name());
            e.exit_code() as i32
        }
    };
    process::exit(code);
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn validator_address(raw: &str, ctx: &RunContext) -> Result<Address, ProvisionError> {
    let address = Address::parse(raw)?;
    if address.network_suffix() != ctx.network.hrp_suffix() {
        return Err(ProvisionError::Config(format!("{raw} no pertenece a la red {}", ctx.network_name())));
    }
    Ok(address)
}

fn plan(command: &Command, config: &ProvisionConfig, ctx: &RunContext) -> Result<ProvisionPlan, ProvisionError> {
    let fee = config.fee(command.phase());
    let plan = match command {
        Command::Bootstrap => {
            let settings = BootstrapSettings { fee,
                                               oracle_public_key: config.oracle_public_key.clone(),
                                               test_network: ctx.is_test_network() };
            bootstrap_plan(&settings, Arc::new(ScryptoToolchain::new(config.toolchain())))?
        }
        Command::DappDefinition => dapp_definition_plan(&DappDefinitionSettings::new(fee))?,
        Command::FillKeeper { validator } => {
            let raw = validator.clone()
                               .or_else(|| config.validator_address.clone())
                               .ok_or_else(|| ProvisionError::Config("VALIDATOR_ADDRESS no está definido".into()))?;
            fill_keeper_plan(&KeeperSettings::new(fee, validator_address(&raw, ctx)?)?)?
        }
        Command::Smoke { amount } => {
            let amount = amount.parse::<Decimal>()
                               .map_err(|_| ProvisionError::Config(format!("--amount={amount} no es un decimal")))?;
            smoke_plan(&SmokeSettings { fee,
                                        amount,
                                        test_network: ctx.is_test_network() })?
        }
    };
    Ok(plan)
}

async fn run(command: &Command) -> Result<(), ProvisionError> {
    let phase = command.phase();
    let config = ProvisionConfig::from_env()?;
    let account = config.load_account()?;
    let gateway = HttpGateway::new(config.gateway_url.as_str())?;
    let runner = PhaseRunner::new(&gateway, &account, &config.store.releases_dir).with_funding(config.funding_policy(phase))
                                                                                 .with_poll_policy(config.poll_policy());

    let prep = runner.prepare(phase).await?;
    let ctx = &prep.ctx;
    let plan = plan(command, &config, ctx)?;
    let store = JsonCheckpointStore::new(&config.store.deploy_dir, ctx.archive_dir());
    let journal = FileEventLog::open(config.store.journal_path(ctx.network_name()))?;

    let report = runner.execute(ctx, &plan, &store, &journal).await?.into_result()?;
    for (key, value) in report.checkpoint.values() {
        info!("checkpoint:value {key}={value}");
    }
    info!("provision:done phase={} network={} committed={} submissions={} recovered={}",
          phase.name(),
          ctx.network_name(),
          report.committed().len(),
          report.submissions,
          report.recovered.len());
    Ok(())
}
