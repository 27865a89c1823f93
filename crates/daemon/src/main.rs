//! `fabricd`: process entry point for the coordinator, a worker runtime, or
//! an in-process demo of both together.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fabric_bus::{Bus, LocalBus};
use fabric_coordinator::{run_liveness_sweeper, run_task_status_consumer, run_worker_status_consumer, Coordinator};
use fabric_core::{Clock, SystemClock, WorkerId};
use fabric_daemon::{config, http};
use fabric_push::{LocalPushChannel, PushChannel};
use fabric_store::{MemoryStore, Store};
use fabric_worker::WorkerRuntime;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "fabricd", about = "Distributed task-execution fabric daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Task registry, worker roster, liveness sweep, and admin HTTP surface.
    Coordinator,
    /// A single worker runtime.
    Worker {
        #[arg(long)]
        id: Option<String>,
    },
    /// One coordinator and N in-process workers sharing a bus and store, for
    /// exercising the full lifecycle without external infrastructure.
    Demo {
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    match cli.command {
        Command::Coordinator => run_coordinator(cancel).await,
        Command::Worker { id } => run_worker(id, cancel).await,
        Command::Demo { workers } => run_demo(workers.unwrap_or_else(config::demo_workers), cancel).await,
    }
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received, draining");
        cancel.cancel();
    }
}

async fn run_coordinator(cancel: CancellationToken) -> Result<()> {
    let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let push: Arc<dyn PushChannel> = Arc::new(LocalPushChannel::new());

    let coordinator = Arc::new(
        Coordinator::new(bus.clone(), store, push.clone(), SystemClock).with_liveness_timeout(config::liveness_timeout()),
    );
    coordinator.rehydrate().await.context("rehydrating coordinator state from the store")?;

    let worker_status = tokio::spawn(run_worker_status_consumer(coordinator.clone(), bus.clone(), cancel.clone()));
    let task_status = tokio::spawn(run_task_status_consumer(coordinator.clone(), bus.clone(), cancel.clone()));
    let sweeper =
        tokio::spawn(run_liveness_sweeper(coordinator.clone(), config::liveness_sweep_interval(), cancel.clone()));

    serve_admin_http(coordinator, push, cancel).await?;

    let _ = tokio::join!(worker_status, task_status, sweeper);
    Ok(())
}

async fn serve_admin_http<C: Clock>(
    coordinator: Arc<Coordinator<C>>,
    push: Arc<dyn PushChannel>,
    cancel: CancellationToken,
) -> Result<()> {
    let router = http::build_router(coordinator, push);
    let listener = tokio::net::TcpListener::bind(config::admin_addr()).await.context("binding admin HTTP listener")?;
    let local_addr = listener.local_addr().context("reading bound admin HTTP address")?;
    tracing::info!(addr = %local_addr, "admin HTTP listening");

    let drain = config::drain_timeout();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            tokio::time::sleep(drain).await;
        })
        .await
        .context("admin HTTP server failed")?;
    Ok(())
}

async fn run_worker(id: Option<String>, cancel: CancellationToken) -> Result<()> {
    // Standalone `fabricd worker` still binds an in-process bus/store: a
    // networked backend is a future addition behind the same Bus/Store
    // traits, not something this subcommand has to special-case.
    let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let worker_id = WorkerId::new(id.unwrap_or_else(random_worker_id));
    tracing::info!(worker_id = %worker_id, "starting worker runtime");

    let worker = WorkerRuntime::new(worker_id, bus, store, SystemClock, config::worker_config());
    fabric_worker::run(worker, cancel).await;
    Ok(())
}

async fn run_demo(worker_count: usize, cancel: CancellationToken) -> Result<()> {
    let bus: Arc<dyn Bus> = Arc::new(LocalBus::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let push: Arc<dyn PushChannel> = Arc::new(LocalPushChannel::new());

    let coordinator = Arc::new(
        Coordinator::new(bus.clone(), store.clone(), push.clone(), SystemClock)
            .with_liveness_timeout(config::liveness_timeout()),
    );

    let worker_status = tokio::spawn(run_worker_status_consumer(coordinator.clone(), bus.clone(), cancel.clone()));
    let task_status = tokio::spawn(run_task_status_consumer(coordinator.clone(), bus.clone(), cancel.clone()));
    let sweeper =
        tokio::spawn(run_liveness_sweeper(coordinator.clone(), config::liveness_sweep_interval(), cancel.clone()));

    let mut worker_handles = Vec::with_capacity(worker_count);
    for i in 0..worker_count {
        let worker_id = WorkerId::new(format!("demo-worker-{i}"));
        let worker = WorkerRuntime::new(worker_id, bus.clone(), store.clone(), SystemClock, config::worker_config());
        worker_handles.push(tokio::spawn(fabric_worker::run(worker, cancel.clone())));
    }
    tracing::info!(workers = worker_count, "demo fleet started");

    serve_admin_http(coordinator, push, cancel).await?;

    let _ = tokio::join!(worker_status, task_status, sweeper);
    for handle in worker_handles {
        let _ = handle.await;
    }
    Ok(())
}

fn random_worker_id() -> String {
    format!("worker-{}", uuid::Uuid::new_v4())
}
