use std::collections::HashMap;

use super::types::Scheduler;
use crate::node::Node;
use crate::tasks::types::Task;

const FAVORED: f64 = 0.1;
const OTHER: f64 = 1.0;

/// Favors the next node in line on every call to `score`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    last_worker: usize,
}

impl RoundRobin {
    pub const NAME: &'static str = "roundrobin";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for RoundRobin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn select_candidate_nodes<'a>(&self, _task: &Task, nodes: &'a [Node]) -> Vec<&'a Node> {
        nodes.iter().collect()
    }

    fn score(&mut self, _task: &Task, nodes: &[&Node]) -> HashMap<String, f64> {
        if nodes.is_empty() {
            return HashMap::new();
        }

        self.last_worker = if self.last_worker + 1 < nodes.len() {
            self.last_worker + 1
        } else {
            0
        };

        nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let score = if idx == self.last_worker { FAVORED } else { OTHER };
                (node.name.clone(), score)
            })
            .collect()
    }

    fn pick<'a>(&self, scores: &HashMap<String, f64>, candidates: &[&'a Node]) -> Option<&'a Node> {
        let score_of = |node: &Node| scores.get(&node.name).copied().unwrap_or(f64::INFINITY);

        let (first, rest) = candidates.split_first()?;
        let mut best = *first;
        let mut lowest = score_of(best);
        for &node in rest {
            let score = score_of(node);
            if score < lowest {
                best = node;
                lowest = score;
            }
        }
        Some(best)
    }
}
