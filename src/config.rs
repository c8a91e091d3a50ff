use std::str::FromStr;
use std::time::Duration;

use crate::utils::RetryPolicy;

/// Where a restarted task goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPlacement {
    /// Re-send the task to the worker that last owned it.
    #[default]
    PinToLastWorker,
    /// Drop the old assignment and let the scheduler place it again.
    Reschedule,
}

impl FromStr for RestartPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pin" | "pin-to-last-worker" => Ok(RestartPlacement::PinToLastWorker),
            "reschedule" => Ok(RestartPlacement::Reschedule),
            other => Err(format!("unknown restart placement: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub scheduler: String,
    pub dispatch_period: Duration,
    pub reconcile_period: Duration,
    pub health_check_period: Duration,
    pub node_stats_period: Duration,
    /// Bound on every manager -> worker call, health probes included.
    pub request_timeout: Duration,
    pub stats_retry: RetryPolicy,
    pub max_restarts: u32,
    pub restart_placement: RestartPlacement,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            scheduler: "roundrobin".to_string(),
            dispatch_period: Duration::from_secs(10),
            reconcile_period: Duration::from_secs(15),
            health_check_period: Duration::from_secs(60),
            node_stats_period: Duration::from_secs(15),
            request_timeout: Duration::from_secs(5),
            stats_retry: RetryPolicy::default(),
            max_restarts: 3,
            restart_placement: RestartPlacement::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub execute_period: Duration,
    pub reconcile_period: Duration,
    pub stats_period: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            execute_period: Duration::from_secs(10),
            reconcile_period: Duration::from_secs(15),
            stats_period: Duration::from_secs(15),
        }
    }
}
