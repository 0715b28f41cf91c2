//! botflow - Main Entry Point
//!
//! Command-line front end: validate saved workflows, run them once or
//! continuously against an executor, and list the node kinds it offers.

use anyhow::{bail, Context};
use botflow::{
    config::{AppConfig, LoggingSettings, WorkflowFile},
    execution::{
        ExecutionController, ExecutionMessage, ExecutionWorker, ExecutorClient,
        HttpExecutorClient, MockExecutor, Phase, RunOutcome,
    },
    graph::{Graph, NodeCatalog},
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the CLI drains worker messages.
const TICK: Duration = Duration::from_millis(50);

/// Longest wait for a stop to be acknowledged.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "botflow", version, about = "Run robot dataflow graphs on a remote executor")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Executor base URL, overriding the config file
    #[arg(long, global = true)]
    executor_url: Option<String>,

    /// Use the in-memory executor instead of HTTP
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a workflow and report dropped edges and execution order
    Validate { workflow: PathBuf },
    /// Execute a workflow once and print the result
    Run { workflow: PathBuf },
    /// Run a workflow continuously, then stop it
    Continuous {
        workflow: PathBuf,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// List the node kinds the executor offers
    Nodes,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load_or_default(),
    };
    if let Some(url) = &cli.executor_url {
        config.executor.base_url = url.clone();
    }

    let _guard = init_tracing(&config.logging);
    tracing::info!("Starting botflow {}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(async move {
        if cli.mock {
            tracing::info!("Using in-memory executor");
            execute(cli.command, MockExecutor::new(), &config).await
        } else {
            let client = HttpExecutorClient::new(&config.executor)?;
            tracing::info!("Using executor at {}", client.base_url());
            execute(cli.command, client, &config).await
        }
    })
}

/// Console logging to stderr, plus daily rolling files when `log_dir` is set.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(logging: &LoggingSettings) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "botflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn execute<C>(command: Command, client: C, config: &AppConfig) -> anyhow::Result<()>
where
    C: ExecutorClient + 'static,
{
    let catalog = load_catalog(&client).await;

    match command {
        Command::Validate { workflow } => {
            let graph = load_workflow(&workflow, &catalog)?;
            let order = graph.execution_order()?;
            println!("{} node(s), {} edge(s)", graph.len(), graph.edges().len());
            println!("Execution order: {}", join(order.iter()));
            Ok(())
        }
        Command::Run { workflow } => {
            let mut graph = load_workflow(&workflow, &catalog)?;
            let outcome = run_once(client, config, &mut graph).await?;
            print_outcome(&outcome);
            if !outcome.success {
                bail!(
                    "Execution failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
        Command::Continuous { workflow, seconds } => {
            let mut graph = load_workflow(&workflow, &catalog)?;
            run_continuous(client, config, &mut graph, Duration::from_secs(seconds)).await
        }
        Command::Nodes => {
            for kind in catalog.iter() {
                let inputs = kind
                    .inputs
                    .iter()
                    .map(|p| format!("{}: {} ({:?})", p.name, p.port_type, p.default_mode()));
                let outputs = kind
                    .outputs
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.port_type));
                println!("{} [{}]", kind.name, kind.category);
                println!("    in:  {}", join(inputs));
                println!("    out: {}", join(outputs));
            }
            Ok(())
        }
    }
}

/// Built-in kinds, extended by whatever the executor lists.
async fn load_catalog<C: ExecutorClient>(client: &C) -> NodeCatalog {
    let mut catalog = NodeCatalog::builtin();
    match client.list_node_kinds().await {
        Ok(listing) => match NodeCatalog::from_listing(&listing) {
            Ok(remote) => {
                tracing::debug!("Executor lists {} node kind(s)", remote.len());
                catalog.extend(remote);
            }
            Err(e) => tracing::warn!("Ignoring executor node listing: {}", e),
        },
        Err(e) => tracing::warn!("Could not fetch node kinds, using built-ins: {}", e),
    }
    catalog
}

fn load_workflow(path: &Path, catalog: &NodeCatalog) -> anyhow::Result<Graph> {
    let file = WorkflowFile::load(path)?;
    let (graph, report) = file
        .to_graph(catalog)
        .with_context(|| format!("Failed to rebuild workflow {}", path.display()))?;

    for dropped in &report.dropped_edges {
        tracing::warn!("Dropped edge {}: {}", dropped.edge.id, dropped.reason);
    }
    for (node, input) in &report.ignored_inputs {
        tracing::warn!("Ignored unknown input {}.{}", node, input);
    }
    for (edge, error) in graph.revalidate() {
        tracing::warn!("Edge {} fails validation: {}", edge, error);
    }
    Ok(graph)
}

async fn run_once<C: ExecutorClient + 'static>(
    client: C,
    config: &AppConfig,
    graph: &mut Graph,
) -> anyhow::Result<RunOutcome> {
    let (bridge, worker) = ExecutionWorker::spawn(client, &config.polling);
    let mut controller = ExecutionController::new(bridge, config);
    controller.run_once(graph)?;

    let outcome = loop {
        let mut finished = None;
        for message in controller.process_messages(graph) {
            match message {
                ExecutionMessage::RunCompleted(outcome) => finished = Some(outcome),
                ExecutionMessage::Rejected { error, .. } => bail!(error),
                _ => {}
            }
        }
        if let Some(outcome) = finished {
            break outcome;
        }
        tokio::time::sleep(TICK).await;
    };

    controller.shutdown();
    worker.await.context("Execution worker panicked")?;
    Ok(outcome)
}

async fn run_continuous<C: ExecutorClient + 'static>(
    client: C,
    config: &AppConfig,
    graph: &mut Graph,
    duration: Duration,
) -> anyhow::Result<()> {
    let (bridge, worker) = ExecutionWorker::spawn(client, &config.polling);
    let mut controller = ExecutionController::new(bridge, config);
    controller.start_continuous(graph)?;

    let deadline = Instant::now() + duration;
    let mut was_running = false;
    while Instant::now() < deadline {
        report_messages(controller.process_messages(graph));
        match controller.phase() {
            Phase::ContinuousRunning => was_running = true,
            Phase::Idle if was_running => {
                println!("Executor ended the run");
                break;
            }
            Phase::Idle => {
                if let Some(error) = controller.last_error() {
                    bail!("Continuous start failed: {}", error);
                }
            }
            _ => {}
        }
        tokio::time::sleep(TICK).await;
    }

    if controller.phase() == Phase::ContinuousRunning {
        controller.stop_continuous()?;
        let stop_deadline = Instant::now() + STOP_TIMEOUT;
        while controller.phase() != Phase::Idle && Instant::now() < stop_deadline {
            tokio::time::sleep(TICK).await;
            report_messages(controller.process_messages(graph));
        }
        if controller.phase() != Phase::Idle {
            tracing::warn!("Stop not acknowledged within {:?}", STOP_TIMEOUT);
        }
    }

    controller.shutdown();
    worker.await.context("Execution worker panicked")?;
    Ok(())
}

fn report_messages(messages: Vec<ExecutionMessage>) {
    for message in messages {
        match message {
            ExecutionMessage::StatusUpdated(status) => println!(
                "iterations: {}  last execution: {:.3}s",
                status.count_of_iterations,
                status.last_execution_time.unwrap_or_default()
            ),
            ExecutionMessage::PollFailed {
                error,
                consecutive_failures,
            } => eprintln!("status poll failed ({}x): {}", consecutive_failures, error),
            ExecutionMessage::Rejected { operation, error } => {
                eprintln!("{:?} rejected: {}", operation, error)
            }
            _ => {}
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let verdict = if outcome.success { "succeeded" } else { "failed" };
    println!("Run {} {} in {:?}", outcome.request_id, verdict, outcome.elapsed);
    for entry in &outcome.logs {
        println!("  [{}] {}", entry.level, entry.message);
    }
    if let Some(results) = &outcome.results {
        match serde_json::to_string_pretty(results) {
            Ok(text) => println!("{}", text),
            Err(e) => tracing::warn!("Could not print results: {}", e),
        }
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}
