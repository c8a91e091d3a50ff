use std::collections::HashMap;

use uuid::Uuid;

/// Worker <-> task index. Both directions are only ever changed together,
/// and a task belongs to at most one worker.
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    worker_tasks: HashMap<String, Vec<Uuid>>,
    task_worker: HashMap<Uuid, String>,
}

impl Assignments {
    pub fn new<'a>(workers: impl IntoIterator<Item = &'a String>) -> Self {
        Assignments {
            worker_tasks: workers.into_iter().map(|w| (w.clone(), Vec::new())).collect(),
            task_worker: HashMap::new(),
        }
    }

    /// Record `task` on `worker`. Returns the current owner instead if the
    /// task is already placed.
    pub fn assign(&mut self, task: Uuid, worker: &str) -> Result<(), String> {
        if let Some(owner) = self.task_worker.get(&task) {
            return Err(owner.clone());
        }
        self.task_worker.insert(task, worker.to_string());
        self.worker_tasks
            .entry(worker.to_string())
            .or_default()
            .push(task);
        Ok(())
    }

    pub fn unassign(&mut self, task: &Uuid) -> Option<String> {
        let worker = self.task_worker.remove(task)?;
        if let Some(tasks) = self.worker_tasks.get_mut(&worker) {
            tasks.retain(|t| t != task);
        }
        Some(worker)
    }

    pub fn worker_for(&self, task: &Uuid) -> Option<&str> {
        self.task_worker.get(task).map(String::as_str)
    }

    pub fn tasks_on(&self, worker: &str) -> &[Uuid] {
        self.worker_tasks.get(worker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.task_worker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_worker.is_empty()
    }
}
