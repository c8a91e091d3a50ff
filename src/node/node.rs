use tracing::{debug, error};

use super::types::{Node, NodeError};
use crate::utils::{RetryPolicy, with_retry};
use crate::worker::client::WorkerClient;
use crate::worker::types::Stats;

impl Node {
    pub fn new(name: &str, api: &str, role: &str) -> Self {
        let ip = name.split(':').next().unwrap_or(name).to_string();
        Node {
            name: name.to_string(),
            api: api.to_string(),
            ip,
            role: role.to_string(),
            ..Default::default()
        }
    }

    /// Registry entry for a worker listening on `host:port`.
    pub fn for_worker(address: &str) -> Self {
        Node::new(address, &format!("http://{address}"), "worker")
    }

    pub fn apply_stats(&mut self, stats: Stats) {
        self.memory = stats.mem_total_kb();
        self.disk = stats.disk_total();
        self.cores = stats.total_cpus;
        self.stats = Some(stats);
    }

    /// Poll `<api>/stats` through the retry helper and refresh capacity.
    pub async fn get_stats(
        &mut self,
        client: &WorkerClient,
        policy: RetryPolicy,
    ) -> Result<&Stats, NodeError> {
        let api = self.api.clone();
        let stats = with_retry(policy, "node stats", || client.stats(&api))
            .await
            .map_err(|source| {
                error!(node = %self.name, error = %source, "unable to fetch node stats");
                NodeError::Stats {
                    node: self.name.clone(),
                    source,
                }
            })?;

        debug!(node = %self.name, mem_total_kb = stats.mem_total_kb, disk_total = stats.disk_total, "node stats refreshed");
        self.apply_stats(stats);
        Ok(self.stats.get_or_insert_with(Stats::default))
    }
}
