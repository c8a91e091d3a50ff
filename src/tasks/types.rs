use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum State {
    #[default]
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl State {
    pub const ALL: [State; 5] = [
        State::Pending,
        State::Scheduled,
        State::Running,
        State::Completed,
        State::Failed,
    ];
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Pending => "pending",
            State::Scheduled => "scheduled",
            State::Running => "running",
            State::Completed => "completed",
            State::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A host port published by the runtime for one exposed container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

/// Exposed port ("80/tcp") to the host bindings the runtime assigned to it.
pub type PortMap = BTreeMap<String, Vec<PortBinding>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: Uuid,
    pub container_id: Option<String>,
    pub name: String,
    pub state: State,
    pub image: String,
    pub cpu: f64,
    pub memory: i64,
    pub disk: i64,
    pub env: Vec<String>,
    pub exposed_ports: BTreeSet<String>,
    pub host_ports: PortMap,
    pub restart_policy: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub health_check: String,
    pub restart_count: u32,
    pub restarts_exhausted: bool,
}

impl Default for Task {
    fn default() -> Self {
        Task {
            id: Uuid::new_v4(),
            container_id: None,
            name: String::new(),
            state: State::Pending,
            image: String::new(),
            cpu: 0.0,
            memory: 0,
            disk: 0,
            env: Vec::new(),
            exposed_ports: BTreeSet::new(),
            host_ports: PortMap::new(),
            restart_policy: String::new(),
            start_time: None,
            end_time: None,
            health_check: String::new(),
            restart_count: 0,
            restarts_exhausted: false,
        }
    }
}

impl Task {
    /// First published host port, in exposed-port order.
    pub fn host_port(&self) -> Option<&str> {
        self.host_ports
            .values()
            .flat_map(|bindings| bindings.iter())
            .find_map(|binding| binding.host_port.as_deref())
            .filter(|port| !port.is_empty())
    }

    /// Name used for the runtime unit. Falls back to the task ID so two
    /// unnamed tasks never collide.
    pub fn runtime_name(&self) -> String {
        if self.name.is_empty() {
            format!("task-{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// A request to move `task` to `state`. Events are the only thing ever queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub state: State,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub task: Task,
}

impl TaskEvent {
    pub fn new(state: State, task: Task) -> Self {
        TaskEvent {
            id: Uuid::new_v4(),
            state,
            timestamp: Utc::now(),
            task,
        }
    }
}

/// Runtime unit configuration derived from a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub name: String,
    pub exposed_ports: BTreeSet<String>,
    pub image: String,
    pub cpu: f64,
    pub memory: i64,
    pub disk: i64,
    pub env: Vec<String>,
    pub restart_policy: String,
}

impl Config {
    pub fn from_task(task: &Task) -> Self {
        Config {
            name: task.runtime_name(),
            image: task.image.clone(),
            cpu: task.cpu,
            memory: task.memory,
            disk: task.disk,
            env: task.env.clone(),
            exposed_ports: task.exposed_ports.clone(),
            restart_policy: task.restart_policy.clone(),
            ..Default::default()
        }
    }
}

/// What the runtime reports about a live unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inspection {
    pub status: String,
    pub host_ports: PortMap,
}

impl Inspection {
    pub fn is_exited(&self) -> bool {
        matches!(self.status.as_str(), "exited" | "dead")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to connect to container runtime: {0}")]
    Connect(String),

    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("task {0} has no container id")]
    MissingContainerId(Uuid),

    #[error("runtime failure: {0}")]
    Failure(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_decodes_with_defaults() {
        let raw = r#"{"state":"Scheduled","task":{"image":"nginx:alpine"}}"#;
        let event: TaskEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.state, State::Scheduled);
        assert_eq!(event.task.image, "nginx:alpine");
        assert_eq!(event.task.state, State::Pending);
        assert!(!event.task.id.is_nil());
    }

    #[test]
    fn reconciled_fields_survive_the_wire() {
        let mut task = Task {
            state: State::Running,
            container_id: Some("abc123".to_string()),
            start_time: Some(Utc::now()),
            ..Default::default()
        };
        task.host_ports.insert(
            "80/tcp".to_string(),
            vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some("49153".to_string()),
            }],
        );

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
        assert_eq!(back.host_port(), Some("49153"));
    }

    #[test]
    fn host_port_skips_empty_bindings() {
        let mut task = Task::default();
        task.host_ports.insert("443/tcp".to_string(), vec![]);
        task.host_ports.insert(
            "80/tcp".to_string(),
            vec![PortBinding {
                host_ip: None,
                host_port: Some("8081".to_string()),
            }],
        );
        assert_eq!(task.host_port(), Some("8081"));
        assert_eq!(Task::default().host_port(), None);
    }

    #[test]
    fn config_uses_task_id_when_unnamed() {
        let task = Task::default();
        let config = Config::from_task(&task);
        assert_eq!(config.name, format!("task-{}", task.id));
    }
}
