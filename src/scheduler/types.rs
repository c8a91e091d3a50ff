use std::collections::HashMap;

use crate::node::Node;
use crate::tasks::types::Task;

/// A placement strategy. Placement runs in three steps: filter the node set,
/// score the survivors (lower is better), pick one.
pub trait Scheduler: Send + Sync {
    fn name(&self) -> &str;

    fn select_candidate_nodes<'a>(&self, task: &Task, nodes: &'a [Node]) -> Vec<&'a Node>;

    fn score(&mut self, task: &Task, nodes: &[&Node]) -> HashMap<String, f64>;

    fn pick<'a>(&self, scores: &HashMap<String, f64>, candidates: &[&'a Node]) -> Option<&'a Node>;
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchedulerError {
    #[error("unknown scheduler: {0}")]
    Unknown(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
