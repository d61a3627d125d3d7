use clap::{Args, Parser, Subcommand, ValueEnum};
use faultline_core::{ProbeArtifact, ResultSet};
use faultline_probes::{
    render_command, CheckRegistry, EngineApiClient, EngineApiSource, ManifestSource, MockCheck,
    ProbeReport, ProbeRun, ProbeRunConfig, ProbeSource, ProbeTracker,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Probe verdict engine for fault-injection experiments"
)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the experiment's probes and show their initial verdicts
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
    /// Run the probe lifecycle around a simulated fault with passing checks
    DryRun {
        #[command(flatten)]
        source: SourceArgs,
        /// Default per-check timeout in seconds
        #[arg(long, env = "STATUS_CHECK_TIMEOUT", default_value_t = 180)]
        timeout: u64,
        /// Seconds between fault-window samples
        #[arg(long, env = "STATUS_CHECK_DELAY", default_value_t = 2)]
        delay: u64,
        /// Seconds the simulated fault lasts
        #[arg(long, default_value_t = 10)]
        fault_duration: u64,
        #[arg(long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
    /// Render a command template against a JSON artifact register
    Render {
        /// Template, e.g. "echo {{.probe-name.field}}"
        #[arg(long)]
        template: String,
        /// JSON file mapping probe names to their artifacts
        #[arg(long)]
        artifacts: PathBuf,
    },
    /// Sweep a saved result set and report the final verdicts
    Finalize {
        /// JSON file holding a serialized result set
        #[arg(long)]
        result: PathBuf,
        #[arg(long, env = "EXPERIMENT_NAME", default_value = "node-drain")]
        experiment: String,
        #[arg(long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Experiment whose probes are resolved
    #[arg(long, env = "EXPERIMENT_NAME", default_value = "node-drain")]
    experiment: String,
    /// Namespace of the ChaosEngine
    #[arg(long, env = "CHAOS_NAMESPACE", default_value = "litmus")]
    namespace: String,
    /// Name of the ChaosEngine
    #[arg(long, env = "CHAOSENGINE")]
    engine: Option<String>,
    /// API server to read the ChaosEngine from
    #[arg(long, env = "CHAOS_API_URL", default_value = "http://127.0.0.1:6443")]
    api_url: String,
    /// Read the ChaosEngine from a manifest file instead of the API server
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Inspect { source, output } => run_inspect(&source, output).await,
        Commands::DryRun {
            source,
            timeout,
            delay,
            fault_duration,
            output,
        } => run_dry(&source, timeout, delay, fault_duration, output).await,
        Commands::Render {
            template,
            artifacts,
        } => run_render(&template, &artifacts),
        Commands::Finalize {
            result,
            experiment,
            output,
        } => {
            let report = finalize_file(&result, &experiment).await?;
            print_report(&report, output)
        }
    }
}

/// Logs go to stderr so reports on stdout stay machine readable
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Show the probes declared for the experiment, all still Awaited
async fn run_inspect(args: &SourceArgs, output: OutputFormat) -> miette::Result<()> {
    let source = build_source(args)?;
    let probes = source.fetch(&args.experiment).await?;
    let tracker = ProbeTracker::initialize(&probes)?;

    let report = ProbeReport::from_result(&args.experiment, &tracker.snapshot().await);
    print_report(&report, output)
}

/// Run every phase against passing mock checks
async fn run_dry(
    args: &SourceArgs,
    timeout: u64,
    delay: u64,
    fault_duration: u64,
    output: OutputFormat,
) -> miette::Result<()> {
    let source = build_source(args)?;
    let config = ProbeRunConfig {
        experiment_name: args.experiment.clone(),
        chaos_namespace: args.namespace.clone(),
        engine_name: args.engine.clone().unwrap_or_default(),
        probe_timeout: Duration::from_secs(timeout),
        sampling_interval: Duration::from_secs(delay),
    };
    let registry = CheckRegistry::new().with_all(Arc::new(MockCheck::new()));

    let run = ProbeRun::prepare(source.as_ref(), registry, &config).await?;
    info!(
        "Dry run of experiment {} with {} probe(s), simulated fault lasts {}s",
        config.experiment_name,
        run.probes().len(),
        fault_duration
    );

    let report = run
        .execute(tokio::time::sleep(Duration::from_secs(fault_duration)))
        .await?;
    print_report(&report, output)
}

fn run_render(template: &str, artifacts_path: &Path) -> miette::Result<()> {
    let data = read_file(artifacts_path)?;
    let artifacts: BTreeMap<String, ProbeArtifact> = faultline_core::from_json(&data)?;
    let rendered = render_command(template, &artifacts)?;
    println!("{}", rendered);
    Ok(())
}

/// Load a saved result set, fail what is still Awaited and build its report
async fn finalize_file(path: &Path, experiment: &str) -> miette::Result<ProbeReport> {
    let data = read_file(path)?;
    let result: ResultSet = faultline_core::from_json(&data)?;

    let tracker = ProbeTracker::from_result(result);
    tracker.sweep().await;
    Ok(ProbeReport::from_result(experiment, &tracker.snapshot().await))
}

fn build_source(args: &SourceArgs) -> miette::Result<Box<dyn ProbeSource>> {
    if let Some(path) = &args.manifest {
        info!("Reading probes from manifest {}", path.display());
        return Ok(Box::new(ManifestSource::from_file(path)?));
    }

    let engine = args.engine.as_deref().filter(|e| !e.is_empty()).ok_or_else(|| {
        miette::miette!("No chaosengine given: pass --engine (or CHAOSENGINE) or --manifest")
    })?;
    Ok(Box::new(EngineApiSource::new(
        EngineApiClient::new(&args.api_url),
        &args.namespace,
        engine,
    )))
}

fn print_report(report: &ProbeReport, output: OutputFormat) -> miette::Result<()> {
    let text = match output {
        OutputFormat::Json => faultline_core::to_json_pretty(report)?,
        OutputFormat::Yaml => faultline_core::to_yaml(report)?,
    };
    println!("{}", text);
    Ok(())
}

fn read_file(path: &Path) -> miette::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read '{}': {}", path.display(), e))
}
