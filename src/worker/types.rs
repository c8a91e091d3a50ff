use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::tasks::runtime::Runtime;
use crate::tasks::types::{RuntimeError, State, Task, TaskEvent};

/// A worker owns a queue of pending events and the execution state of
/// every task it has been handed. Each structure sits behind its own lock,
/// never held across a runtime call.
pub struct Worker {
    pub name: String,
    pub(crate) queue: Mutex<VecDeque<TaskEvent>>,
    pub(crate) db: Mutex<HashMap<Uuid, Task>>,
    pub(crate) stats: Mutex<Option<Stats>>,
    pub(crate) system: Mutex<sysinfo::System>,
    pub(crate) runtime: Arc<dyn Runtime>,
    pub(crate) config: WorkerConfig,
}

/// Resource snapshot served on `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Stats {
    pub mem_total_kb: u64,
    pub mem_available_kb: u64,
    pub disk_total: u64,
    pub disk_free: u64,
    pub cpu_usage: f32,
    pub load_one: f64,
    pub total_cpus: u64,
    pub hostname: String,
    pub task_count: u64,
}

pub struct TaskServer {
    pub worker: Arc<Worker>,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition { task_id: Uuid, from: State, to: State },

    #[error("task {task_id} should not reach state {state} on a worker")]
    UnexpectedState { task_id: Uuid, state: State },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
