//! Non-interactive driver for pipewright pipelines.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use pipewright::cloud::LocalStateStore;
use pipewright::composer::{PipelineComposer, PipelineFile, SecretSource};
use pipewright::config::{AccountConfig, OrchestratorConfig};
use pipewright::events::LoggingEventSink;
use pipewright::graph::LevelResolver;
use pipewright::orchestrator::{CloudContext, EnvironmentOrchestrator, ServiceDeployerRegistry};
use pipewright::phases::{PhaseDeployerRegistry, SecretBundle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pipewright", version)]
#[command(about = "Deploy and delete delivery pipelines from a pipeline file", long_about = None)]
struct Cli {
    /// Log at debug level. RUST_LOG overrides this.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a pipeline file without touching the cloud
    Check {
        /// Pipeline file
        #[arg(short, long, default_value = "pipeline.json")]
        file: PathBuf,
        /// Pipeline to check (default: every pipeline in the file)
        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Print the secrets each phase needs as JSON
    ListSecrets {
        /// Pipeline file
        #[arg(short, long, default_value = "pipeline.json")]
        file: PathBuf,
        /// Pipeline name
        #[arg(short, long)]
        pipeline: String,
    },
    /// Deploy a pipeline
    Deploy {
        #[command(flatten)]
        target: Target,
        /// Base64 JSON array of {phaseName, name, value} secrets
        #[arg(long, env = "PIPEWRIGHT_SECRETS", hide_env_values = true)]
        secrets: Option<String>,
    },
    /// Delete a pipeline and the resources its phases created
    Delete {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Pipeline file
    #[arg(short, long, default_value = "pipeline.json")]
    file: PathBuf,
    /// Pipeline name
    #[arg(short, long)]
    pipeline: String,
    /// Account config file
    #[arg(short, long, env = "PIPEWRIGHT_ACCOUNT_CONFIG")]
    account_config: PathBuf,
    /// File the local cloud state is kept in
    #[arg(long, env = "PIPEWRIGHT_STATE_FILE", default_value = "pipewright-state.json")]
    state_file: PathBuf,
    /// Services of one level run at most this many at a time (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    max_concurrency: usize,
}

fn init_tracing(debug: bool, format: LogFormat) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn composer(max_concurrency: usize) -> PipelineComposer {
    let config = OrchestratorConfig::new().with_max_concurrency_per_level(max_concurrency);
    let environments = EnvironmentOrchestrator::new(
        Arc::new(ServiceDeployerRegistry::builtin()),
        Arc::new(LevelResolver::new()),
        Arc::new(LoggingEventSink::debug()),
    )
    .with_config(config);
    PipelineComposer::new(
        Arc::new(PhaseDeployerRegistry::builtin(Arc::new(environments))),
        Arc::new(LoggingEventSink::info()),
    )
}

fn load_file(path: &Path) -> anyhow::Result<PipelineFile> {
    PipelineFile::load(path).with_context(|| format!("failed to read pipeline file {}", path.display()))
}

fn cloud_context(target: &Target) -> anyhow::Result<CloudContext> {
    let account = AccountConfig::load(&target.account_config)
        .with_context(|| format!("failed to read account config {}", target.account_config.display()))?;
    let store = Arc::new(LocalStateStore::new(&target.state_file));
    let adapters = store.adapters(&account.account_id, &account.region);
    Ok(CloudContext::new(account, adapters))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check { file, pipeline } => {
            let file = load_file(&file)?;
            let composer = composer(0);
            let names: Vec<String> = match pipeline {
                Some(name) => vec![name],
                None => file.pipelines.keys().cloned().collect(),
            };

            let mut failed = 0;
            for name in &names {
                let errors = composer.check(&file, name);
                if errors.is_empty() {
                    println!("pipeline '{name}' is valid");
                } else {
                    failed += 1;
                    println!("pipeline '{name}' has {} error(s):", errors.len());
                    for err in &errors {
                        println!("  - {err}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} pipeline(s) failed validation");
            }
        }
        Commands::ListSecrets { file, pipeline } => {
            let file = load_file(&file)?;
            let questions = composer(0).list_secret_questions(&file, &pipeline)?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
        }
        Commands::Deploy { target, secrets } => {
            let file = load_file(&target.file)?;
            let cloud = cloud_context(&target)?;
            let bundles = match secrets {
                Some(encoded) => SecretBundle::decode_all(&encoded)?,
                None => Default::default(),
            };

            let pipeline = composer(target.max_concurrency)
                .deploy(&file, &target.pipeline, &cloud, SecretSource::NonInteractive(bundles))
                .await?;
            info!(arn = %pipeline.arn, "pipeline ready");
            println!("{}", pipeline.arn);
        }
        Commands::Delete { target } => {
            let file = load_file(&target.file)?;
            let cloud = cloud_context(&target)?;
            composer(target.max_concurrency)
                .delete(&file, &target.pipeline, &cloud)
                .await?;
            println!("pipeline '{}' deleted", target.pipeline);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
