#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use r_orchestrator::config::{ManagerConfig, WorkerConfig};
use r_orchestrator::manager::Manager;
use r_orchestrator::tasks::MockRuntime;
use r_orchestrator::utils::RetryPolicy;
use r_orchestrator::worker::{TaskServer, Worker};

/// A worker API served on an ephemeral local port. Loops are not started;
/// tests drive `run_task`/`update_tasks` by hand.
pub struct TestWorker {
    pub address: String,
    pub worker: Arc<Worker>,
    pub runtime: Arc<MockRuntime>,
    token: CancellationToken,
}

impl Drop for TestWorker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub async fn spawn_worker(name: &str, runtime: MockRuntime) -> TestWorker {
    let runtime = Arc::new(runtime);
    let worker = Arc::new(Worker::new(name, runtime.clone(), WorkerConfig::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let token = CancellationToken::new();

    tokio::spawn(TaskServer::serve(listener, worker.clone(), token.clone()));

    TestWorker {
        address,
        worker,
        runtime,
        token,
    }
}

pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        request_timeout: Duration::from_secs(2),
        stats_retry: RetryPolicy::once(),
        ..Default::default()
    }
}

pub fn manager_for(workers: &[&TestWorker], config: ManagerConfig) -> Arc<Manager> {
    let addresses = workers.iter().map(|w| w.address.clone()).collect();
    Arc::new(Manager::new(addresses, config).unwrap())
}

/// Serve `GET /health` with a fixed status. Returns the bound port.
pub async fn spawn_health_endpoint(status: StatusCode) -> (u16, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let token = CancellationToken::new();
    let app = Router::new().route("/health", get(move || async move { status }));

    tokio::spawn({
        let token = token.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
        }
    });

    (port, token)
}
