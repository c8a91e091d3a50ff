use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::assignments::Assignments;
use super::types::{Dispatch, Manager, ManagerError, ManagerResult, ManagerState};
use crate::config::{ManagerConfig, RestartPlacement};
use crate::node::Node;
use crate::scheduler::{Scheduler, SchedulerRegistry};
use crate::shutdown::ServiceHandle;
use crate::tasks::{
    state::valid_state_transition,
    types::{State, Task, TaskEvent},
};
use crate::utils::run_periodic;
use crate::worker::client::WorkerClient;

impl Manager {
    /// Build a manager for `workers` (`host:port` each), choosing the
    /// scheduler named in `config` from the default registry.
    pub fn new(workers: Vec<String>, config: ManagerConfig) -> ManagerResult<Self> {
        let scheduler = SchedulerRegistry::default().build(&config.scheduler)?;
        Self::with_scheduler(workers, scheduler, config)
    }

    pub fn with_scheduler(
        workers: Vec<String>,
        scheduler: Box<dyn Scheduler>,
        config: ManagerConfig,
    ) -> ManagerResult<Self> {
        let client = WorkerClient::new(config.request_timeout)?;
        let nodes = workers.iter().map(|w| Node::for_worker(w)).collect();
        let state = ManagerState {
            assignments: Assignments::new(&workers),
            ..Default::default()
        };

        info!(workers = ?workers, scheduler = scheduler.name(), "manager created");
        Ok(Manager {
            workers,
            state: Mutex::new(state),
            nodes: Mutex::new(nodes),
            scheduler: Mutex::new(scheduler),
            client,
            config,
        })
    }

    pub async fn add_task(&self, event: TaskEvent) {
        debug!(event_id = %event.id, task_id = %event.task.id, state = %event.state, "queued event");
        self.state.lock().await.pending.push_back(event);
    }

    pub async fn get_tasks(&self) -> Vec<Task> {
        self.state.lock().await.task_db.values().cloned().collect()
    }

    pub async fn get_task(&self, id: &Uuid) -> Option<Task> {
        self.state.lock().await.task_db.get(id).cloned()
    }

    pub async fn get_event(&self, id: &Uuid) -> Option<TaskEvent> {
        self.state.lock().await.event_db.get(id).cloned()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn worker_for(&self, task_id: &Uuid) -> Option<String> {
        self.state
            .lock()
            .await
            .assignments
            .worker_for(task_id)
            .map(str::to_string)
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.nodes.lock().await.clone()
    }

    /// Run the scheduler's filter/score/pick over the node registry.
    pub async fn select_worker(&self, task: &Task) -> ManagerResult<Node> {
        let nodes = self.nodes.lock().await.clone();
        let mut scheduler = self.scheduler.lock().await;

        let candidates = scheduler.select_candidate_nodes(task, &nodes);
        if candidates.is_empty() {
            return Err(ManagerError::NoCapacity(task.id));
        }

        let scores = scheduler.score(task, &candidates);
        scheduler
            .pick(&scores, &candidates)
            .cloned()
            .ok_or(ManagerError::NoCapacity(task.id))
    }

    /// One dispatch step: take the oldest pending event and either place it
    /// or, for a task that is already placed, forward a stop.
    pub async fn send_work(&self) -> ManagerResult<Dispatch> {
        let Some(event) = self.state.lock().await.pending.pop_front() else {
            debug!("no pending tasks to allocate");
            return Ok(Dispatch::Idle);
        };

        let task_id = event.task.id;
        info!(task_id = %task_id, event_id = %event.id, state = %event.state, "pulled event off the pending queue");

        let placed = {
            let state = self.state.lock().await;
            state.assignments.worker_for(&task_id).map(|worker| {
                (
                    worker.to_string(),
                    state.task_db.get(&task_id).map(|t| t.state),
                )
            })
        };

        if let Some((worker, current)) = placed {
            return self.update_placed_task(event, worker, current).await;
        }

        self.place_task(event).await
    }

    async fn update_placed_task(
        &self,
        event: TaskEvent,
        worker: String,
        current: Option<State>,
    ) -> ManagerResult<Dispatch> {
        let task_id = event.task.id;
        let stoppable = event.state == State::Completed
            && current.is_some_and(|state| valid_state_transition(state, State::Completed));

        if !stoppable {
            warn!(task_id = %task_id, worker = %worker, current = ?current, requested = %event.state, "invalid request for existing task");
            return Err(ManagerError::InvalidUpdate {
                task_id,
                worker,
                current,
                requested: event.state,
            });
        }

        self.stop_task(&worker, task_id).await?;
        Ok(Dispatch::StopRequested { task_id, worker })
    }

    async fn place_task(&self, event: TaskEvent) -> ManagerResult<Dispatch> {
        let task_id = event.task.id;

        // Only a request to run can start a placement.
        if !matches!(event.state, State::Scheduled | State::Running) {
            let from = self
                .get_task(&task_id)
                .await
                .map_or(event.task.state, |t| t.state);
            warn!(task_id = %task_id, %from, requested = %event.state, "dropping event for unplaced task");
            return Err(ManagerError::InvalidTransition {
                task_id,
                from,
                to: event.state,
            });
        }

        let from = {
            let mut state = self.state.lock().await;
            state.event_db.insert(event.id, event.clone());
            state
                .task_db
                .get(&task_id)
                .map_or(event.task.state, |t| t.state)
        };
        if !valid_state_transition(from, State::Scheduled) {
            warn!(task_id = %task_id, %from, "task cannot be scheduled");
            return Err(ManagerError::InvalidTransition {
                task_id,
                from,
                to: State::Scheduled,
            });
        }

        let node = self.select_worker(&event.task).await.inspect_err(|e| {
            warn!(task_id = %task_id, error = %e, "error selecting worker for task");
        })?;
        info!(task_id = %task_id, worker = %node.name, "selected worker for task");

        let mut task = event.task.clone();
        task.state = State::Scheduled;
        {
            let mut state = self.state.lock().await;
            if let Err(worker) = state.assignments.assign(task_id, &node.name) {
                return Err(ManagerError::AlreadyAssigned { task_id, worker });
            }
            state.task_db.insert(task_id, task.clone());
        }
        self.sync_task_counts().await;

        let outgoing = TaskEvent {
            task,
            ..event.clone()
        };

        match self.client.submit(&node.name, &outgoing).await {
            Ok(_) => {
                info!(task_id = %task_id, worker = %node.name, "sent task to worker");
                Ok(Dispatch::Sent {
                    task_id,
                    worker: node.name,
                })
            }
            Err(e) if e.is_transport() => {
                warn!(task_id = %task_id, worker = %node.name, error = %e, "worker unreachable, requeueing");
                {
                    let mut state = self.state.lock().await;
                    state.assignments.unassign(&task_id);
                    state.pending.push_back(event);
                }
                self.sync_task_counts().await;
                Ok(Dispatch::Requeued { task_id })
            }
            Err(e) => {
                error!(task_id = %task_id, worker = %node.name, error = %e, "worker rejected task");
                Err(e.into())
            }
        }
    }

    async fn stop_task(&self, worker: &str, task_id: Uuid) -> ManagerResult<()> {
        self.client.cancel(worker, task_id).await.inspect_err(|e| {
            error!(task_id = %task_id, worker, error = %e, "error requesting task stop");
        })?;
        info!(task_id = %task_id, worker, "task has been scheduled to be stopped");
        Ok(())
    }

    /// One reconciliation step: pull every worker's task list into the task
    /// database. A worker that cannot be listed is skipped for this pass.
    pub async fn update_tasks(&self) {
        for worker in &self.workers {
            debug!(worker = %worker, "checking worker for task updates");

            let reported = match self.client.list(worker).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(worker = %worker, error = %e, "error getting tasks from worker");
                    continue;
                }
            };

            let mut state = self.state.lock().await;
            for task in reported {
                if !state.task_db.contains_key(&task.id) {
                    warn!(task_id = %task.id, worker = %worker, "task reported by worker was not found");
                    continue;
                }
                if state.assignments.worker_for(&task.id) != Some(worker.as_str()) {
                    debug!(task_id = %task.id, worker = %worker, "ignoring report from non-owning worker");
                    continue;
                }
                let Some(stored) = state.task_db.get_mut(&task.id) else {
                    continue;
                };

                if stored.state != task.state {
                    if valid_state_transition(stored.state, task.state) {
                        stored.state = task.state;
                    } else {
                        warn!(task_id = %task.id, from = %stored.state, to = %task.state, "ignoring invalid reported transition");
                    }
                }
                stored.start_time = task.start_time;
                stored.end_time = task.end_time;
                stored.container_id = task.container_id;
                stored.host_ports = task.host_ports;
            }
        }

        self.sync_task_counts().await;
    }

    /// Poll every node's stats concurrently through the retry policy. A node
    /// that stays unreachable keeps its previous snapshot. Runs on its own
    /// loop so a dead worker never stretches a reconciliation pass.
    pub async fn refresh_nodes(&self) {
        let snapshot = self.nodes.lock().await.clone();
        let client = &self.client;
        let policy = self.config.stats_retry;

        let refreshed = join_all(snapshot.into_iter().map(|mut node| async move {
            let result = node.get_stats(client, policy).await.map(|_| ());
            (node, result)
        }))
        .await;

        {
            let mut nodes = self.nodes.lock().await;
            for (fresh, result) in refreshed {
                match result {
                    Ok(()) => {
                        if let Some(node) = nodes.iter_mut().find(|n| n.name == fresh.name) {
                            node.memory = fresh.memory;
                            node.disk = fresh.disk;
                            node.cores = fresh.cores;
                            node.stats = fresh.stats;
                        }
                    }
                    Err(e) => warn!(node = %fresh.name, error = %e, "keeping stale node stats"),
                }
            }
        }
        self.sync_task_counts().await;
    }

    async fn sync_task_counts(&self) {
        let counts: HashMap<String, usize> = {
            let state = self.state.lock().await;
            self.workers
                .iter()
                .map(|w| (w.clone(), state.assignments.tasks_on(w).len()))
                .collect()
        };

        for node in self.nodes.lock().await.iter_mut() {
            node.task_count = counts.get(&node.name).copied().unwrap_or(0);
        }
    }

    /// Probe the task's health endpoint on its worker's host. A task with no
    /// health-check path is healthy by definition.
    pub async fn check_task_health(&self, task: &Task) -> ManagerResult<()> {
        // No probe path means nothing to probe, not a probe of `/`.
        if task.health_check.is_empty() {
            debug!(task_id = %task.id, "no health check configured");
            return Ok(());
        }

        let worker = self
            .worker_for(&task.id)
            .await
            .ok_or(ManagerError::NotAssigned(task.id))?;
        let host = worker.split(':').next().unwrap_or(&worker);
        let port = task.host_port().ok_or(ManagerError::NoHostPort(task.id))?;
        let url = format!("http://{host}:{port}{}", task.health_check);

        debug!(task_id = %task.id, url = %url, "calling health check");
        self.client.probe(&url).await.inspect_err(|e| {
            warn!(task_id = %task.id, url = %url, error = %e, "health check failed");
        })?;
        Ok(())
    }

    /// One health-check step. Returns the tasks that were restarted.
    pub async fn do_health_checks(&self) -> Vec<Uuid> {
        let tasks: Vec<Task> = self.get_tasks().await;
        let mut restarted = Vec::new();

        for task in tasks {
            if task.restart_count >= self.config.max_restarts {
                let dead = match task.state {
                    State::Failed => true,
                    State::Running => self.check_task_health(&task).await.is_err(),
                    _ => false,
                };
                if dead {
                    self.mark_exhausted(task.id).await;
                }
                continue;
            }

            let needs_restart = match task.state {
                State::Running => self.check_task_health(&task).await.is_err(),
                State::Failed => true,
                _ => false,
            };
            if !needs_restart {
                continue;
            }

            match self.restart_task(task.id).await {
                Ok(_) => restarted.push(task.id),
                Err(e) => error!(task_id = %task.id, error = %e, "error restarting task"),
            }
        }

        restarted
    }

    async fn mark_exhausted(&self, task_id: Uuid) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.task_db.get_mut(&task_id) {
            if !task.restarts_exhausted {
                task.restarts_exhausted = true;
                warn!(
                    task_id = %task_id,
                    restarts = task.restart_count,
                    state = %task.state,
                    "task exhausted its restarts and will not be restarted again"
                );
            }
        }
    }

    /// Move the task back to `Scheduled`, count the restart, and send it out
    /// again according to the configured placement policy.
    pub async fn restart_task(&self, task_id: Uuid) -> ManagerResult<Dispatch> {
        let (target, event) = {
            let mut state = self.state.lock().await;
            let worker = state
                .assignments
                .worker_for(&task_id)
                .map(str::to_string)
                .ok_or(ManagerError::NotAssigned(task_id))?;
            let task = state
                .task_db
                .get_mut(&task_id)
                .ok_or(ManagerError::TaskNotFound(task_id))?;

            if !valid_state_transition(task.state, State::Scheduled) {
                return Err(ManagerError::InvalidTransition {
                    task_id,
                    from: task.state,
                    to: State::Scheduled,
                });
            }
            task.state = State::Scheduled;
            task.restart_count += 1;
            info!(task_id = %task_id, worker = %worker, restarts = task.restart_count, "restarting task");

            let event = TaskEvent::new(State::Scheduled, task.clone());
            match self.config.restart_placement {
                RestartPlacement::PinToLastWorker => (Some(worker), event),
                RestartPlacement::Reschedule => {
                    state.assignments.unassign(&task_id);
                    state.pending.push_back(event.clone());
                    (None, event)
                }
            }
        };

        let Some(worker) = target else {
            self.sync_task_counts().await;
            return Ok(Dispatch::Requeued { task_id });
        };

        match self.client.submit(&worker, &event).await {
            Ok(_) => Ok(Dispatch::Sent { task_id, worker }),
            Err(e) if e.is_transport() => {
                warn!(task_id = %task_id, worker = %worker, error = %e, "worker unreachable, requeueing restart");
                {
                    let mut state = self.state.lock().await;
                    state.assignments.unassign(&task_id);
                    state.pending.push_back(event);
                }
                self.sync_task_counts().await;
                Ok(Dispatch::Requeued { task_id })
            }
            Err(e) => {
                error!(task_id = %task_id, worker = %worker, error = %e, "worker rejected restart");
                Err(e.into())
            }
        }
    }

    /// Spawn the dispatch, reconciliation, node-stats and health-check loops.
    pub fn start(self: &Arc<Self>, parent: &CancellationToken) -> ServiceHandle {
        let token = parent.child_token();
        let mut handles = Vec::with_capacity(4);

        let manager = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "manager-dispatch",
            self.config.dispatch_period,
            token.clone(),
            move || {
                let manager = manager.clone();
                async move {
                    if let Err(e) = manager.send_work().await {
                        warn!(error = %e, "dispatch step dropped an event");
                    }
                }
            },
        )));

        let manager = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "manager-reconcile",
            self.config.reconcile_period,
            token.clone(),
            move || {
                let manager = manager.clone();
                async move {
                    manager.update_tasks().await;
                }
            },
        )));

        let manager = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "manager-node-stats",
            self.config.node_stats_period,
            token.clone(),
            move || {
                let manager = manager.clone();
                async move {
                    manager.refresh_nodes().await;
                }
            },
        )));

        let manager = self.clone();
        handles.push(tokio::spawn(run_periodic(
            "manager-health",
            self.config.health_check_period,
            token.clone(),
            move || {
                let manager = manager.clone();
                async move {
                    let restarted = manager.do_health_checks().await;
                    debug!(restarted = restarted.len(), "task health checks completed");
                }
            },
        )));

        ServiceHandle::new(token, handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerError;
    use crate::utils::RetryPolicy;
    use std::time::Duration;

    /// An address nothing listens on.
    fn dead_address() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        address
    }

    fn fast_config() -> ManagerConfig {
        ManagerConfig {
            request_timeout: Duration::from_millis(500),
            stats_retry: RetryPolicy::once(),
            ..Default::default()
        }
    }

    async fn seed(manager: &Manager, task: &Task, worker: &str) {
        let mut state = manager.state.lock().await;
        state.task_db.insert(task.id, task.clone());
        state.assignments.assign(task.id, worker).unwrap();
    }

    #[tokio::test]
    async fn unknown_scheduler_is_refused() {
        let config = ManagerConfig {
            scheduler: "binpack".to_string(),
            ..Default::default()
        };
        let err = Manager::new(vec![dead_address()], config).err().unwrap();
        assert!(matches!(
            err,
            ManagerError::Scheduler(SchedulerError::Unknown(ref name)) if name == "binpack"
        ));
    }

    #[tokio::test]
    async fn empty_queue_is_idle() {
        let manager = Manager::new(vec![dead_address()], fast_config()).unwrap();
        assert_eq!(manager.send_work().await.unwrap(), Dispatch::Idle);
    }

    #[tokio::test]
    async fn unreachable_worker_requeues_without_assignment() {
        let manager = Manager::new(vec![dead_address()], fast_config()).unwrap();
        let event = TaskEvent::new(State::Scheduled, Task::default());
        let task_id = event.task.id;
        manager.add_task(event.clone()).await;

        let outcome = manager.send_work().await.unwrap();

        assert_eq!(outcome, Dispatch::Requeued { task_id });
        assert_eq!(manager.worker_for(&task_id).await, None);
        assert_eq!(manager.pending_len().await, 1);
        assert_eq!(manager.get_task(&task_id).await.unwrap().state, State::Scheduled);
        assert!(manager.get_event(&event.id).await.is_some());
        assert!(manager.nodes().await.iter().all(|n| n.task_count == 0));

        // The retry is a fresh placement, not an update of a placed task.
        assert_eq!(manager.send_work().await.unwrap(), Dispatch::Requeued { task_id });
    }

    #[tokio::test]
    async fn non_stop_update_of_placed_task_is_rejected() {
        let worker = dead_address();
        let manager = Manager::new(vec![worker.clone()], fast_config()).unwrap();
        let task = Task {
            state: State::Scheduled,
            ..Default::default()
        };
        seed(&manager, &task, &worker).await;
        manager.add_task(TaskEvent::new(State::Running, task.clone())).await;

        let err = manager.send_work().await.unwrap_err();

        assert!(matches!(
            err,
            ManagerError::InvalidUpdate { current: Some(State::Scheduled), requested: State::Running, .. }
        ));
        assert_eq!(manager.pending_len().await, 0);
        assert_eq!(manager.worker_for(&task.id).await, Some(worker));
    }

    #[tokio::test]
    async fn completed_task_cannot_be_placed_again() {
        let manager = Manager::new(vec![dead_address()], fast_config()).unwrap();
        let task = Task {
            state: State::Completed,
            ..Default::default()
        };
        manager.add_task(TaskEvent::new(State::Scheduled, task.clone())).await;

        let err = manager.send_work().await.unwrap_err();

        assert!(matches!(
            err,
            ManagerError::InvalidTransition { from: State::Completed, to: State::Scheduled, .. }
        ));
        assert_eq!(manager.worker_for(&task.id).await, None);
    }

    #[tokio::test]
    async fn stop_for_unplaced_task_is_dropped_without_placing() {
        let manager = Manager::new(vec![dead_address()], fast_config()).unwrap();
        let task = Task::default();
        manager.add_task(TaskEvent::new(State::Completed, task.clone())).await;

        let err = manager.send_work().await.unwrap_err();

        assert!(matches!(
            err,
            ManagerError::InvalidTransition { from: State::Pending, to: State::Completed, .. }
        ));
        assert_eq!(manager.worker_for(&task.id).await, None);
        assert!(manager.get_task(&task.id).await.is_none());
        assert_eq!(manager.pending_len().await, 0);
        assert!(manager.nodes().await.iter().all(|n| n.task_count == 0));

        // A later run request is still a fresh placement.
        manager.add_task(TaskEvent::new(State::Scheduled, task.clone())).await;
        assert_eq!(
            manager.send_work().await.unwrap(),
            Dispatch::Requeued { task_id: task.id }
        );
    }

    #[tokio::test]
    async fn failed_task_at_limit_is_flagged_not_restarted() {
        let worker = dead_address();
        let manager = Manager::new(vec![worker.clone()], fast_config()).unwrap();
        let task = Task {
            state: State::Failed,
            restart_count: 3,
            ..Default::default()
        };
        seed(&manager, &task, &worker).await;

        let restarted = manager.do_health_checks().await;

        assert!(restarted.is_empty());
        let stored = manager.get_task(&task.id).await.unwrap();
        assert!(stored.restarts_exhausted);
        assert_eq!(stored.restart_count, 3);
        assert_eq!(stored.state, State::Failed);
        assert_eq!(manager.pending_len().await, 0);
    }

    #[tokio::test]
    async fn reschedule_policy_queues_a_fresh_placement() {
        let worker = dead_address();
        let config = ManagerConfig {
            restart_placement: RestartPlacement::Reschedule,
            ..fast_config()
        };
        let manager = Manager::new(vec![worker.clone()], config).unwrap();
        let task = Task {
            state: State::Failed,
            ..Default::default()
        };
        seed(&manager, &task, &worker).await;

        let outcome = manager.restart_task(task.id).await.unwrap();

        assert_eq!(outcome, Dispatch::Requeued { task_id: task.id });
        assert_eq!(manager.worker_for(&task.id).await, None);
        let stored = manager.get_task(&task.id).await.unwrap();
        assert_eq!(stored.state, State::Scheduled);
        assert_eq!(stored.restart_count, 1);

        let state = manager.state.lock().await;
        let event = state.pending.front().unwrap();
        assert_eq!(event.state, State::Scheduled);
        assert_eq!(event.task.restart_count, 1);
    }

    #[tokio::test]
    async fn restart_of_completed_task_is_invalid() {
        let worker = dead_address();
        let manager = Manager::new(vec![worker.clone()], fast_config()).unwrap();
        let task = Task {
            state: State::Completed,
            ..Default::default()
        };
        seed(&manager, &task, &worker).await;

        let err = manager.restart_task(task.id).await.unwrap_err();
        assert!(matches!(err, ManagerError::InvalidTransition { from: State::Completed, .. }));
        assert_eq!(manager.get_task(&task.id).await.unwrap().restart_count, 0);
    }

    #[tokio::test]
    async fn health_check_without_path_or_port() {
        let worker = dead_address();
        let manager = Manager::new(vec![worker.clone()], fast_config()).unwrap();

        let unprobed = Task {
            state: State::Running,
            ..Default::default()
        };
        assert!(manager.check_task_health(&unprobed).await.is_ok());

        let unpublished = Task {
            state: State::Running,
            health_check: "/health".to_string(),
            ..Default::default()
        };
        seed(&manager, &unpublished, &worker).await;
        let err = manager.check_task_health(&unpublished).await.unwrap_err();
        assert!(matches!(err, ManagerError::NoHostPort(id) if id == unpublished.id));
    }

    #[tokio::test]
    async fn unreachable_nodes_keep_previous_stats() {
        let manager = Manager::new(vec![dead_address()], fast_config()).unwrap();
        manager.refresh_nodes().await;

        let nodes = manager.nodes().await;
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].stats.is_none());
    }

    #[tokio::test]
    async fn dead_worker_does_not_stretch_reconciliation() {
        let config = ManagerConfig::default();
        let period = config.reconcile_period;
        let manager = Manager::new(vec![dead_address(), dead_address()], config).unwrap();
        let task = Task {
            state: State::Running,
            ..Default::default()
        };
        let owner = manager.workers[0].clone();
        seed(&manager, &task, &owner).await;

        let started = std::time::Instant::now();
        tokio::time::timeout(period, manager.update_tasks())
            .await
            .expect("reconciliation pass outlived its period");

        assert!(started.elapsed() < period);
        assert_eq!(manager.get_task(&task.id).await.unwrap().state, State::Running);
        assert!(manager.nodes().await.iter().all(|n| n.stats.is_none()));
        let owned = manager.nodes().await.into_iter().find(|n| n.name == owner).unwrap();
        assert_eq!(owned.task_count, 1);
    }
}
