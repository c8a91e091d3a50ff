use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::assignments::Assignments;
use crate::config::ManagerConfig;
use crate::node::Node;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::tasks::types::{State, Task, TaskEvent};
use crate::worker::client::{ProtocolError, WorkerClient};

/// Everything a read/modify/write on the manager touches. One lock guards it
/// all and is never held across a network call.
#[derive(Debug, Default)]
pub struct ManagerState {
    pub pending: VecDeque<TaskEvent>,
    pub task_db: HashMap<Uuid, Task>,
    pub event_db: HashMap<Uuid, TaskEvent>,
    pub assignments: Assignments,
}

pub struct Manager {
    pub workers: Vec<String>,
    pub(crate) state: Mutex<ManagerState>,
    pub(crate) nodes: Mutex<Vec<Node>>,
    pub(crate) scheduler: Mutex<Box<dyn Scheduler>>,
    pub(crate) client: WorkerClient,
    pub(crate) config: ManagerConfig,
}

pub struct ManagerServer {
    pub address: String,
    pub port: u16,
    pub manager: Arc<Manager>,
}

/// What one dispatch or restart step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Idle,
    Sent { task_id: Uuid, worker: String },
    StopRequested { task_id: Uuid, worker: String },
    Requeued { task_id: Uuid },
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("no available candidates match resource request for task {0}")]
    NoCapacity(Uuid),

    #[error("task {task_id} on worker {worker} cannot move from {current:?} to {requested}")]
    InvalidUpdate {
        task_id: Uuid,
        worker: String,
        current: Option<State>,
        requested: State,
    },

    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidTransition { task_id: Uuid, from: State, to: State },

    #[error("task {task_id} is already assigned to {worker}")]
    AlreadyAssigned { task_id: Uuid, worker: String },

    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    #[error("task {0} is not assigned to any worker")]
    NotAssigned(Uuid),

    #[error("task {0} has no published host port to probe")]
    NoHostPort(Uuid),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;
