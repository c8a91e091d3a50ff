use serde::{Deserialize, Serialize};

use crate::worker::client::ProtocolError;
use crate::worker::types::Stats;

/// The manager's view of one worker. Capacity fields are informational;
/// round-robin placement never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Node {
    /// `host:port` of the worker API; also the key in the assignment index.
    pub name: String,
    /// Base URL of the worker API, scheme included.
    pub api: String,
    pub ip: String,
    pub cores: u64,
    /// Total memory in KiB.
    pub memory: u64,
    pub memory_allocated: u64,
    /// Total disk in bytes.
    pub disk: u64,
    pub disk_allocated: u64,
    pub stats: Option<Stats>,
    pub role: String,
    pub task_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("unable to fetch stats for node {node}: {source}")]
    Stats {
        node: String,
        #[source]
        source: ProtocolError,
    },
}
