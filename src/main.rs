use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use r_orchestrator::config::{ManagerConfig, RestartPlacement, WorkerConfig};
use r_orchestrator::manager::{Manager, ManagerServer};
use r_orchestrator::shutdown::{ServiceHandle, install_shutdown_handler};
use r_orchestrator::tasks::{DockerRuntime, MockRuntime, Runtime};
use r_orchestrator::worker::{TaskServer, Worker};

#[derive(Parser, Debug)]
#[command(name = "r_orchestrator")]
#[command(version)]
#[command(about = "A minimal container orchestrator: one manager, many workers")]
#[command(propagate_version = true)]
struct Args {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "R_ORCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a worker and its HTTP API
    Worker(WorkerArgs),

    /// Run the manager and its HTTP API
    Manager(ManagerArgs),

    /// Run N workers and a manager in one process
    Cluster(ClusterArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RuntimeKind {
    Docker,
    Mock,
}

#[derive(Parser, Debug)]
struct WorkerArgs {
    /// Worker name, used in logs
    #[arg(long, env = "R_ORCH_WORKER_NAME", default_value = "worker-1")]
    name: String,

    #[arg(long, env = "R_ORCH_WORKER_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "R_ORCH_WORKER_PORT", default_value = "5556")]
    port: u16,

    /// Container runtime used to run tasks
    #[arg(long, env = "R_ORCH_RUNTIME", value_enum, default_value = "docker")]
    runtime: RuntimeKind,
}

#[derive(Parser, Debug)]
struct ManagerArgs {
    #[arg(long, env = "R_ORCH_MANAGER_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "R_ORCH_MANAGER_PORT", default_value = "5555")]
    port: u16,

    /// Worker addresses (comma-separated, format: "host:port")
    #[arg(long, env = "R_ORCH_WORKERS", value_delimiter = ',', required = true)]
    workers: Vec<String>,

    #[arg(long, env = "R_ORCH_SCHEDULER", default_value = "roundrobin")]
    scheduler: String,

    /// Where restarted tasks go: "pin" or "reschedule"
    #[arg(long, env = "R_ORCH_RESTART_PLACEMENT", default_value = "pin")]
    restart_placement: RestartPlacement,
}

#[derive(Parser, Debug)]
struct ClusterArgs {
    #[arg(long, env = "R_ORCH_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "R_ORCH_MANAGER_PORT", default_value = "5555")]
    manager_port: u16,

    /// Port of the first worker; the rest follow consecutively
    #[arg(long, env = "R_ORCH_WORKER_PORT", default_value = "5556")]
    worker_port: u16,

    /// Number of workers to start
    #[arg(long, env = "R_ORCH_WORKER_COUNT", default_value = "3")]
    workers: u16,

    #[arg(long, env = "R_ORCH_RUNTIME", value_enum, default_value = "docker")]
    runtime: RuntimeKind,

    #[arg(long, env = "R_ORCH_SCHEDULER", default_value = "roundrobin")]
    scheduler: String,

    #[arg(long, env = "R_ORCH_RESTART_PLACEMENT", default_value = "pin")]
    restart_placement: RestartPlacement,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = install_shutdown_handler().context("failed to install signal handlers")?;

    match args.command {
        Commands::Worker(worker) => run_worker(worker, shutdown).await,
        Commands::Manager(manager) => run_manager(manager, shutdown).await,
        Commands::Cluster(cluster) => run_cluster(cluster, shutdown).await,
    }
}

fn build_runtime(kind: RuntimeKind) -> anyhow::Result<Arc<dyn Runtime>> {
    Ok(match kind {
        RuntimeKind::Docker => {
            Arc::new(DockerRuntime::new().context("failed to connect to the docker daemon")?)
        }
        RuntimeKind::Mock => Arc::new(MockRuntime::new()),
    })
}

/// Start a worker's loops and return its server future's handle.
fn spawn_worker(
    name: &str,
    host: &str,
    port: u16,
    runtime: Arc<dyn Runtime>,
    shutdown: &CancellationToken,
) -> (ServiceHandle, tokio::task::JoinHandle<std::io::Result<()>>) {
    let worker = Arc::new(Worker::new(name, runtime, WorkerConfig::default()));
    let loops = worker.start(shutdown);
    let server = TaskServer::new(worker, host, port);
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { server.start_server(token).await });
    (loops, handle)
}

async fn wait_server(name: &str, handle: tokio::task::JoinHandle<std::io::Result<()>>) {
    match handle.await {
        Ok(Ok(())) => info!(server = name, "server stopped"),
        Ok(Err(e)) => error!(server = name, error = %e, "server failed"),
        Err(e) => error!(server = name, error = %e, "server task panicked"),
    }
}

async fn run_worker(args: WorkerArgs, shutdown: CancellationToken) -> anyhow::Result<()> {
    let runtime = build_runtime(args.runtime)?;
    info!(name = %args.name, host = %args.host, port = args.port, "starting worker");

    let (loops, server) = spawn_worker(&args.name, &args.host, args.port, runtime, &shutdown);
    wait_server(&args.name, server).await;
    shutdown.cancel();
    loops.stop().await;
    Ok(())
}

fn manager_config(scheduler: String, restart_placement: RestartPlacement) -> ManagerConfig {
    ManagerConfig {
        scheduler,
        restart_placement,
        ..Default::default()
    }
}

async fn run_manager(args: ManagerArgs, shutdown: CancellationToken) -> anyhow::Result<()> {
    let config = manager_config(args.scheduler, args.restart_placement);
    let manager = Arc::new(Manager::new(args.workers, config).context("failed to create manager")?);
    info!(host = %args.host, port = args.port, "starting manager");

    let loops = manager.start(&shutdown);
    ManagerServer::new(manager, &args.host, args.port)
        .start_server(shutdown.clone())
        .await
        .context("manager api failed")?;
    shutdown.cancel();
    loops.stop().await;
    Ok(())
}

async fn run_cluster(args: ClusterArgs, shutdown: CancellationToken) -> anyhow::Result<()> {
    let runtime = build_runtime(args.runtime)?;
    let mut workers = Vec::new();
    let mut running = Vec::new();

    for i in 0..args.workers {
        let port = args
            .worker_port
            .checked_add(i)
            .context("worker port range overflows")?;
        let name = format!("worker-{}", i + 1);
        workers.push(format!("{}:{port}", args.host));
        running.push((name.clone(), spawn_worker(&name, &args.host, port, runtime.clone(), &shutdown)));
    }
    info!(workers = ?workers, "started workers");

    let config = manager_config(args.scheduler, args.restart_placement);
    let manager = Arc::new(Manager::new(workers, config).context("failed to create manager")?);
    let manager_loops = manager.start(&shutdown);
    let result = ManagerServer::new(manager, &args.host, args.manager_port)
        .start_server(shutdown.clone())
        .await;

    shutdown.cancel();
    manager_loops.stop().await;
    for (name, (loops, server)) in running {
        wait_server(&name, server).await;
        loops.stop().await;
    }
    result.context("manager api failed")
}
