use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::stats::get_stats;
use super::types::{Stats, Worker, WorkerError, WorkerResult};
use crate::config::WorkerConfig;
use crate::shutdown::ServiceHandle;
use crate::tasks::{
    runtime::Runtime,
    state::valid_state_transition,
    types::{Config, RuntimeError, State, Task, TaskEvent},
};
use crate::utils::run_periodic;

impl Worker {
    pub fn new(name: &str, runtime: Arc<dyn Runtime>, config: WorkerConfig) -> Self {
        Worker {
            name: name.to_string(),
            queue: Mutex::new(VecDeque::new()),
            db: Mutex::new(HashMap::new()),
            stats: Mutex::new(None),
            system: Mutex::new(sysinfo::System::new()),
            runtime,
            config,
        }
    }

    pub async fn add_task(&self, event: TaskEvent) {
        debug!(worker = %self.name, task_id = %event.task.id, state = %event.state, "queued event");
        self.queue.lock().await.push_back(event);
    }

    pub async fn get_tasks(&self) -> Vec<Task> {
        self.db.lock().await.values().cloned().collect()
    }

    pub async fn get_task(&self, id: &Uuid) -> Option<Task> {
        self.db.lock().await.get(id).cloned()
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Pop one event and drive the task toward its target state. Returns
    /// `Ok(None)` when the queue was empty.
    pub async fn run_task(&self) -> WorkerResult<Option<Task>> {
        let Some(event) = self.queue.lock().await.pop_front() else {
            debug!(worker = %self.name, "no tasks in queue");
            return Ok(None);
        };

        let task_id = event.task.id;
        let persisted = self.db.lock().await.get(&task_id).cloned();
        let from = persisted.as_ref().map_or(event.task.state, |t| t.state);

        if !valid_state_transition(from, event.state) {
            warn!(task_id = %task_id, %from, to = %event.state, "invalid state transition");
            return Err(WorkerError::InvalidStateTransition {
                task_id,
                from,
                to: event.state,
            });
        }

        match event.state {
            State::Scheduled => self.start_task(event.task).await.map(Some),
            State::Completed => {
                let mut task = event.task;
                if task.container_id.is_none() {
                    task.container_id = persisted.and_then(|t| t.container_id);
                }
                self.stop_task(task).await.map(Some)
            }
            state => {
                error!(task_id = %task_id, %state, "should not reach this state");
                Err(WorkerError::UnexpectedState { task_id, state })
            }
        }
    }

    async fn start_task(&self, mut task: Task) -> WorkerResult<Task> {
        task.start_time = Some(Utc::now());
        let config = Config::from_task(&task);

        match self.runtime.run(&config).await {
            Ok(container_id) => {
                task.state = State::Running;
                task.container_id = Some(container_id);
                self.db.lock().await.insert(task.id, task.clone());
                info!(worker = %self.name, task_id = %task.id, container_id = ?task.container_id, "started task");
                Ok(task)
            }
            Err(e) => {
                error!(worker = %self.name, task_id = %task.id, error = %e, "error starting task");
                task.state = State::Failed;
                self.db.lock().await.insert(task.id, task);
                Err(e.into())
            }
        }
    }

    async fn stop_task(&self, mut task: Task) -> WorkerResult<Task> {
        let container_id = task
            .container_id
            .clone()
            .ok_or(RuntimeError::MissingContainerId(task.id))?;

        if let Err(e) = self.runtime.stop(&container_id).await {
            error!(task_id = %task.id, container_id = %container_id, error = %e, "error stopping task");
            return Err(e.into());
        }

        task.end_time = Some(Utc::now());
        task.state = State::Completed;
        self.db.lock().await.insert(task.id, task.clone());
        info!(task_id = %task.id, container_id = %container_id, "stopped and removed task");
        Ok(task)
    }

    /// Check every running task against the runtime. Returns how many were
    /// marked failed.
    pub async fn update_tasks(&self) -> usize {
        let running: Vec<(Uuid, Option<String>)> = self
            .db
            .lock()
            .await
            .values()
            .filter(|t| t.state == State::Running)
            .map(|t| (t.id, t.container_id.clone()))
            .collect();

        let mut failed = 0;
        for (id, container_id) in running {
            let inspection = match &container_id {
                Some(cid) => self.runtime.inspect(cid).await,
                None => Ok(None),
            };

            let mut db = self.db.lock().await;
            let Some(task) = db.get_mut(&id) else {
                continue;
            };
            if task.state != State::Running {
                continue;
            }

            match inspection {
                Ok(None) => {
                    warn!(task_id = %id, "no container found for running task");
                    task.state = State::Failed;
                    failed += 1;
                }
                Ok(Some(inspection)) if inspection.is_exited() => {
                    warn!(task_id = %id, status = %inspection.status, "container is not running");
                    task.state = State::Failed;
                    failed += 1;
                }
                Ok(Some(inspection)) => {
                    task.host_ports = inspection.host_ports;
                }
                Err(e) => {
                    warn!(task_id = %id, error = %e, "error inspecting task, leaving it unchanged");
                }
            }
        }

        failed
    }

    pub async fn collect_stats(&self) -> Stats {
        let task_count = self
            .db
            .lock()
            .await
            .values()
            .filter(|t| t.state == State::Running)
            .count() as u64;

        let stats = {
            let mut system = self.system.lock().await;
            get_stats(&mut system, task_count)
        };
        *self.stats.lock().await = Some(stats.clone());
        stats
    }

    /// Latest snapshot, taking one if the stats loop has not run yet.
    pub async fn stats(&self) -> Stats {
        let cached = self.stats.lock().await.clone();
        match cached {
            Some(stats) => stats,
            None => self.collect_stats().await,
        }
    }

    /// Spawn the execute, reconcile and stats loops.
    pub fn start(self: &Arc<Self>, parent: &CancellationToken) -> ServiceHandle {
        let token = parent.child_token();
        let mut handles = Vec::with_capacity(3);

        let worker = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "worker-execute",
            self.config.execute_period,
            token.clone(),
            move || {
                let worker = worker.clone();
                async move {
                    match worker.run_task().await {
                        Ok(Some(task)) => info!(task_id = %task.id, state = %task.state, "processed task"),
                        Ok(None) => {}
                        Err(e) => error!(worker = %worker.name, error = %e, "error running task"),
                    }
                }
            },
        )));

        let worker = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "worker-reconcile",
            self.config.reconcile_period,
            token.clone(),
            move || {
                let worker = worker.clone();
                async move {
                    let failed = worker.update_tasks().await;
                    debug!(worker = %worker.name, failed, "task updates completed");
                }
            },
        )));

        let worker = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "worker-stats",
            self.config.stats_period,
            token.clone(),
            move || {
                let worker = worker.clone();
                async move {
                    worker.collect_stats().await;
                }
            },
        )));

        ServiceHandle::new(token, handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::runtime::MockRuntime;

    fn worker_with(runtime: Arc<MockRuntime>) -> Worker {
        Worker::new("test-worker", runtime, WorkerConfig::default())
    }

    fn scheduled(image: &str) -> TaskEvent {
        let task = Task {
            image: image.to_string(),
            state: State::Scheduled,
            ..Default::default()
        };
        TaskEvent::new(State::Scheduled, task)
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let worker = worker_with(Arc::new(MockRuntime::new()));
        assert!(worker.run_task().await.unwrap().is_none());
        assert!(worker.get_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn scheduled_event_starts_task() {
        let runtime = Arc::new(MockRuntime::new());
        let worker = worker_with(runtime.clone());
        let event = scheduled("nginx:alpine");
        let id = event.task.id;

        worker.add_task(event).await;
        let task = worker.run_task().await.unwrap().unwrap();

        assert_eq!(task.state, State::Running);
        assert!(task.container_id.as_deref().is_some_and(|c| !c.is_empty()));
        assert!(task.start_time.is_some());
        assert_eq!(worker.get_task(&id).await.unwrap().state, State::Running);
        assert_eq!(runtime.running(), 1);
    }

    #[tokio::test]
    async fn run_failure_marks_task_failed() {
        let worker = worker_with(Arc::new(MockRuntime::failing()));
        let event = scheduled("nginx:alpine");
        let id = event.task.id;

        worker.add_task(event).await;
        let err = worker.run_task().await.unwrap_err();

        assert!(matches!(err, WorkerError::Runtime(_)));
        assert_eq!(worker.get_task(&id).await.unwrap().state, State::Failed);
    }

    #[tokio::test]
    async fn invalid_transition_leaves_record_untouched() {
        let worker = worker_with(Arc::new(MockRuntime::new()));
        let event = scheduled("nginx:alpine");
        let task = event.task.clone();
        worker.add_task(event).await;
        worker.run_task().await.unwrap();

        // Running -> Pending is not allowed.
        worker.add_task(TaskEvent::new(State::Pending, task.clone())).await;
        let err = worker.run_task().await.unwrap_err();

        assert!(matches!(
            err,
            WorkerError::InvalidStateTransition {
                from: State::Running,
                to: State::Pending,
                ..
            }
        ));
        assert_eq!(worker.get_task(&task.id).await.unwrap().state, State::Running);
    }

    #[tokio::test]
    async fn invalid_first_event_is_not_recorded() {
        let worker = worker_with(Arc::new(MockRuntime::new()));
        let task = Task::default();
        let id = task.id;

        worker.add_task(TaskEvent::new(State::Completed, task)).await;
        assert!(worker.run_task().await.is_err());
        assert!(worker.get_task(&id).await.is_none());
    }

    #[tokio::test]
    async fn valid_but_unhandled_target_is_reported() {
        let worker = worker_with(Arc::new(MockRuntime::new()));
        let event = scheduled("nginx:alpine");
        let task = event.task.clone();
        worker.add_task(event).await;
        worker.run_task().await.unwrap();

        worker.add_task(TaskEvent::new(State::Running, task)).await;
        let err = worker.run_task().await.unwrap_err();
        assert!(matches!(err, WorkerError::UnexpectedState { state: State::Running, .. }));
    }

    #[tokio::test]
    async fn completed_event_stops_task() {
        let runtime = Arc::new(MockRuntime::new());
        let worker = worker_with(runtime.clone());
        let event = scheduled("nginx:alpine");
        let id = event.task.id;
        worker.add_task(event).await;
        worker.run_task().await.unwrap();

        let mut stop = worker.get_task(&id).await.unwrap();
        stop.container_id = None;
        worker.add_task(TaskEvent::new(State::Completed, stop)).await;
        let task = worker.run_task().await.unwrap().unwrap();

        assert_eq!(task.state, State::Completed);
        assert!(task.end_time.is_some());
        assert_eq!(runtime.running(), 0);
    }

    #[tokio::test]
    async fn stop_failure_keeps_state() {
        let runtime = Arc::new(MockRuntime::new());
        let worker = worker_with(runtime.clone());
        let event = scheduled("nginx:alpine");
        let id = event.task.id;
        worker.add_task(event).await;
        worker.run_task().await.unwrap();

        runtime.set_fail_stops(true);
        let task = worker.get_task(&id).await.unwrap();
        worker.add_task(TaskEvent::new(State::Completed, task)).await;

        assert!(worker.run_task().await.is_err());
        assert_eq!(worker.get_task(&id).await.unwrap().state, State::Running);
    }

    #[tokio::test]
    async fn reconcile_fails_exited_and_missing_units() {
        let runtime = Arc::new(MockRuntime::new());
        let worker = worker_with(runtime.clone());

        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let mut event = scheduled("nginx:alpine");
            event.task.name = name.to_string();
            ids.push(event.task.id);
            worker.add_task(event).await;
            worker.run_task().await.unwrap();
        }

        let exited = worker.get_task(&ids[0]).await.unwrap().container_id.unwrap();
        let missing = worker.get_task(&ids[1]).await.unwrap().container_id.unwrap();
        runtime.exit(&exited);
        runtime.remove(&missing);

        assert_eq!(worker.update_tasks().await, 2);
        assert_eq!(worker.get_task(&ids[0]).await.unwrap().state, State::Failed);
        assert_eq!(worker.get_task(&ids[1]).await.unwrap().state, State::Failed);
        assert_eq!(worker.get_task(&ids[2]).await.unwrap().state, State::Running);
    }

    #[tokio::test]
    async fn reconcile_syncs_host_ports() {
        let runtime = Arc::new(MockRuntime::with_base_port(45000));
        let worker = worker_with(runtime.clone());
        let mut event = scheduled("nginx:alpine");
        event.task.exposed_ports.insert("80/tcp".to_string());
        let id = event.task.id;
        worker.add_task(event).await;
        worker.run_task().await.unwrap();

        assert!(worker.get_task(&id).await.unwrap().host_ports.is_empty());
        worker.update_tasks().await;
        assert_eq!(worker.get_task(&id).await.unwrap().host_port(), Some("45000"));
    }

    #[tokio::test]
    async fn failed_task_can_be_rescheduled() {
        let runtime = Arc::new(MockRuntime::failing());
        let worker = worker_with(runtime.clone());
        let event = scheduled("nginx:alpine");
        let id = event.task.id;
        worker.add_task(event).await;
        let _ = worker.run_task().await;

        runtime.set_fail_runs(false);
        let mut retry = worker.get_task(&id).await.unwrap();
        retry.state = State::Scheduled;
        retry.restart_count = 1;
        worker.add_task(TaskEvent::new(State::Scheduled, retry)).await;

        let task = worker.run_task().await.unwrap().unwrap();
        assert_eq!(task.state, State::Running);
        assert_eq!(task.restart_count, 1);
    }

    #[tokio::test]
    async fn stats_count_running_tasks() {
        let worker = worker_with(Arc::new(MockRuntime::new()));
        worker.add_task(scheduled("nginx:alpine")).await;
        worker.run_task().await.unwrap();

        let stats = worker.stats().await;
        assert_eq!(stats.task_count, 1);
    }
}
