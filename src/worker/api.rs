use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::types::{Stats, TaskServer, Worker};
use crate::api::{ErrResponse, decode_error};
use crate::tasks::types::{State, Task, TaskEvent};

impl TaskServer {
    pub fn new(worker: Arc<Worker>, address: &str, port: u16) -> Self {
        Self {
            worker,
            address: address.to_string(),
            port,
        }
    }

    pub fn router(worker: Arc<Worker>) -> Router {
        Router::new()
            .route("/tasks", get(get_tasks).post(start_task))
            .route("/tasks/", delete(missing_task_id))
            .route("/tasks/{id}", delete(stop_task))
            .route("/stats", get(get_stats))
            .with_state(worker)
    }

    pub async fn start_server(self, token: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind((self.address.as_str(), self.port)).await?;
        Self::serve(listener, self.worker, token).await
    }

    pub async fn serve(
        listener: TcpListener,
        worker: Arc<Worker>,
        token: CancellationToken,
    ) -> std::io::Result<()> {
        info!(worker = %worker.name, addr = %listener.local_addr()?, "serving worker api");
        axum::serve(listener, Self::router(worker))
            .with_graceful_shutdown(token.cancelled_owned())
            .await
    }
}

async fn get_tasks(AxumState(worker): AxumState<Arc<Worker>>) -> Json<Vec<Task>> {
    Json(worker.get_tasks().await)
}

async fn start_task(
    AxumState(worker): AxumState<Arc<Worker>>,
    body: Result<Json<TaskEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match body {
        Ok(event) => event,
        Err(rejection) => return decode_error(rejection).into_response(),
    };

    let task = event.task.clone();
    worker.add_task(event).await;
    info!(task_id = %task.id, "added task");
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn missing_task_id() -> ErrResponse {
    ErrResponse::new(StatusCode::BAD_REQUEST, "taskID was not supplied")
}

async fn stop_task(AxumState(worker): AxumState<Arc<Worker>>, Path(id): Path<String>) -> Response {
    if id.trim().is_empty() {
        return missing_task_id().await.into_response();
    }

    let Ok(task_id) = Uuid::parse_str(&id) else {
        return ErrResponse::new(
            StatusCode::BAD_REQUEST,
            format!("had issues parsing task ID of {id}"),
        )
        .into_response();
    };

    let Some(mut task) = worker.get_task(&task_id).await else {
        return ErrResponse::new(
            StatusCode::NOT_FOUND,
            format!("cannot find valid task with ID: {task_id}"),
        )
        .into_response();
    };

    task.state = State::Completed;
    let container_id = task.container_id.clone();
    worker.add_task(TaskEvent::new(State::Completed, task)).await;
    info!(task_id = %task_id, container_id = ?container_id, "queued task to stop");
    StatusCode::NO_CONTENT.into_response()
}

async fn get_stats(AxumState(worker): AxumState<Arc<Worker>>) -> Json<Stats> {
    Json(worker.stats().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::tasks::runtime::MockRuntime;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn worker() -> Arc<Worker> {
        Arc::new(Worker::new(
            "api-worker",
            Arc::new(MockRuntime::new()),
            WorkerConfig::default(),
        ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_queues_event_and_echoes_task() {
        let worker = worker();
        let event = TaskEvent::new(State::Scheduled, Task::default());
        let request = Request::post("/tasks")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&event).unwrap()))
            .unwrap();

        let response = TaskServer::router(worker.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], event.task.id.to_string());
        assert_eq!(worker.queue_len().await, 1);
    }

    #[tokio::test]
    async fn malformed_body_is_a_400() {
        let worker = worker();
        let request = Request::post("/tasks")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = TaskServer::router(worker.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["HTTPStatusCode"], 400);
        assert_eq!(worker.queue_len().await, 0);
    }

    #[tokio::test]
    async fn delete_rejects_bad_and_unknown_ids() {
        let router = TaskServer::router(worker());

        let bad = router
            .clone()
            .oneshot(Request::delete("/tasks/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = router
            .clone()
            .oneshot(Request::delete("/tasks/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let unknown = router
            .oneshot(
                Request::delete(format!("/tasks/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(unknown).await["HTTPStatusCode"], 404);
    }

    #[tokio::test]
    async fn delete_queues_completed_copy() {
        let worker = worker();
        worker
            .add_task(TaskEvent::new(
                State::Scheduled,
                Task {
                    state: State::Scheduled,
                    ..Default::default()
                },
            ))
            .await;
        let task = worker.run_task().await.unwrap().unwrap();

        let response = TaskServer::router(worker.clone())
            .oneshot(
                Request::delete(format!("/tasks/{}", task.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let stopped = worker.run_task().await.unwrap().unwrap();
        assert_eq!(stopped.state, State::Completed);
    }

    #[tokio::test]
    async fn stats_endpoint_reports_totals() {
        let response = TaskServer::router(worker())
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stats: Stats = serde_json::from_value(body_json(response).await).unwrap();
        assert!(stats.mem_total_kb() > 0);
    }
}
