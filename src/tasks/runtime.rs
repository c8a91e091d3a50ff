//! Container-runtime interface consumed by the worker, plus an in-memory
//! implementation used by tests and `--runtime mock`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use super::types::{Config, Inspection, PortBinding, PortMap, RuntimeError, RuntimeResult};

#[async_trait]
pub trait Runtime: Send + Sync {
    /// Start a unit for `config` and return its container id.
    async fn run(&self, config: &Config) -> RuntimeResult<String>;

    /// Stop and remove a unit.
    async fn stop(&self, container_id: &str) -> RuntimeResult<()>;

    /// `Ok(None)` when the runtime has no such unit.
    async fn inspect(&self, container_id: &str) -> RuntimeResult<Option<Inspection>>;
}

#[derive(Debug, Clone)]
struct MockContainer {
    name: String,
    status: String,
    host_ports: PortMap,
}

/// Runtime that keeps units in a map. Host ports are handed out from
/// `base_port` upwards, one per exposed port.
pub struct MockRuntime {
    containers: Mutex<HashMap<String, MockContainer>>,
    counter: AtomicU64,
    next_port: AtomicU64,
    fail_runs: AtomicBool,
    fail_stops: AtomicBool,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::with_base_port(40000)
    }

    pub fn with_base_port(base_port: u16) -> Self {
        MockRuntime {
            containers: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            next_port: AtomicU64::new(base_port as u64),
            fail_runs: AtomicBool::new(false),
            fail_stops: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let runtime = Self::new();
        runtime.set_fail_runs(true);
        runtime
    }

    pub fn set_fail_runs(&self, fail: bool) {
        self.fail_runs.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stops(&self, fail: bool) {
        self.fail_stops.store(fail, Ordering::SeqCst);
    }

    /// Simulate a unit exiting on its own.
    pub fn exit(&self, container_id: &str) {
        if let Some(container) = self.lock().get_mut(container_id) {
            container.status = "exited".to_string();
        }
    }

    /// Simulate a unit disappearing from the runtime.
    pub fn remove(&self, container_id: &str) {
        self.lock().remove(container_id);
    }

    pub fn set_host_ports(&self, container_id: &str, host_ports: PortMap) {
        if let Some(container) = self.lock().get_mut(container_id) {
            container.host_ports = host_ports;
        }
    }

    pub fn running(&self) -> usize {
        self.lock()
            .values()
            .filter(|c| c.status == "running")
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockContainer>> {
        self.containers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runtime for MockRuntime {
    async fn run(&self, config: &Config) -> RuntimeResult<String> {
        if self.fail_runs.load(Ordering::SeqCst) {
            return Err(RuntimeError::Failure(format!(
                "mock runtime refused to start {}",
                config.name
            )));
        }

        let mut containers = self.lock();
        if let Some((id, existing)) = containers
            .iter_mut()
            .find(|(_, c)| c.name == config.name)
        {
            existing.status = "running".to_string();
            info!(container_id = %id, name = %config.name, "[MOCK] restarted container");
            return Ok(id.clone());
        }

        let id = format!("mock-{:012x}", self.counter.fetch_add(1, Ordering::SeqCst));
        let host_ports = config
            .exposed_ports
            .iter()
            .map(|port| {
                let host_port = self.next_port.fetch_add(1, Ordering::SeqCst);
                (
                    port.clone(),
                    vec![PortBinding {
                        host_ip: Some("0.0.0.0".to_string()),
                        host_port: Some(host_port.to_string()),
                    }],
                )
            })
            .collect();

        containers.insert(
            id.clone(),
            MockContainer {
                name: config.name.clone(),
                status: "running".to_string(),
                host_ports,
            },
        );
        info!(container_id = %id, image = %config.image, "[MOCK] started container");
        Ok(id)
    }

    async fn stop(&self, container_id: &str) -> RuntimeResult<()> {
        if self.fail_stops.load(Ordering::SeqCst) {
            return Err(RuntimeError::Failure(format!(
                "mock runtime refused to stop {container_id}"
            )));
        }

        match self.lock().remove(container_id) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::Failure(format!(
                "no such container: {container_id}"
            ))),
        }
    }

    async fn inspect(&self, container_id: &str) -> RuntimeResult<Option<Inspection>> {
        Ok(self.lock().get(container_id).map(|c| Inspection {
            status: c.status.clone(),
            host_ports: c.host_ports.clone(),
        }))
    }
}
