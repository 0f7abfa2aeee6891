//! CLI entrypoint for inquest
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use inquest_application::{PipelineOutcome, RunPipelineInput, RunPipelineUseCase};
use inquest_infrastructure::{
    config::{ConfigLoader, Severity},
    investigators::load_fixture,
    InMemoryRegistry, JsonlEventSink, RuleBasedAssessor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inquest", about = "Multi-agent investigation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress the banner and progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a job key
    Run {
        /// Logical job key (e.g. a ticket id)
        #[arg(long)]
        job: String,

        /// Explicit config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON fixture declaring the scripted investigators
        #[arg(long)]
        fixture: PathBuf,

        /// Seed parameter, repeatable (KEY=VALUE)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Override the JSONL event log path
        #[arg(long)]
        events: Option<PathBuf>,

        /// Also write tracing output to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Show the config file discovery order
    ConfigSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    // Held for the lifetime of main so buffered file logs are flushed
    let mut _log_guard = None;
    match &cli.command {
        Commands::Run {
            log_file: Some(path),
            ..
        } => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("could not create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            _log_guard = Some(guard);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(writer)
                .with_ansi(false)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }

    match cli.command {
        Commands::ConfigSources => {
            ConfigLoader::print_config_sources();
            Ok(())
        }
        Commands::Run {
            job,
            config,
            fixture,
            params,
            events,
            ..
        } => run(job, config, fixture, params, events, cli.quiet).await,
    }
}

async fn run(
    job: String,
    config_path: Option<PathBuf>,
    fixture: PathBuf,
    params: Vec<String>,
    events: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    info!("Starting inquest");

    let config = ConfigLoader::load(config_path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not load configuration: {}", e))?;

    // Report configuration issues; errors are fatal
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Error => eprintln!("error: {}", issue.message),
            Severity::Warning => eprintln!("warning: {}", issue.message),
        }
    }
    if issues.iter().any(|i| i.severity == Severity::Error) {
        bail!("configuration is invalid");
    }

    let plan = config.pipeline.to_plan()?;

    // === Dependency Injection ===
    let registry = Arc::new(InMemoryRegistry::new(config.session.lease_timeout_secs));
    let mut use_case = RunPipelineUseCase::new(registry)
        .with_assessor(Arc::new(RuleBasedAssessor::new()));

    for investigator in load_fixture(&fixture)
        .with_context(|| format!("could not load fixture {}", fixture.display()))?
    {
        use_case = use_case.with_investigator(Arc::new(investigator));
    }

    let events_path = events
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.observability.events_path.clone());
    if !events_path.is_empty()
        && let Some(sink) = JsonlEventSink::new(&events_path)
    {
        use_case = use_case.with_observer(Arc::new(sink));
    }

    let mut input = RunPipelineInput::new(job.clone(), plan)
        .with_resolution(config.resolution.to_policy())
        .with_min_evidence(config.policy.to_policy())
        .with_workers(config.pipeline.workers);
    input.heartbeat_secs = config.session.heartbeat_secs;

    for param in &params {
        let Some((key, value)) = param.split_once('=') else {
            bail!("invalid --param `{}`: expected KEY=VALUE", param);
        };
        input = input.with_param(key, value);
    }

    if !quiet {
        println!();
        println!("inquest: job {}", job);
        println!(
            "phases: {}",
            input
                .plan
                .phases()
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        println!();
    }

    match use_case.execute(input).await? {
        PipelineOutcome::Completed {
            session_id,
            artifact,
        } => {
            if !quiet {
                println!("session {} completed", session_id);
            }
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }
        PipelineOutcome::Halted { session_id, reason } => {
            eprintln!("session {} halted: {}", session_id, reason);
            println!("{}", serde_json::to_string_pretty(&reason)?);
            std::process::exit(1);
        }
    }
}
