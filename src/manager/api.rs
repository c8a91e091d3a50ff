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

use super::types::{Manager, ManagerServer};
use crate::api::{ErrResponse, decode_error};
use crate::tasks::types::{State, Task, TaskEvent};

impl ManagerServer {
    pub fn new(manager: Arc<Manager>, address: &str, port: u16) -> Self {
        Self {
            address: address.to_string(),
            port,
            manager,
        }
    }

    pub fn router(manager: Arc<Manager>) -> Router {
        Router::new()
            .route("/tasks", get(get_tasks).post(start_task))
            .route("/tasks/", delete(missing_task_id))
            .route("/tasks/{id}", delete(stop_task))
            .with_state(manager)
    }

    pub async fn start_server(self, token: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind((self.address.as_str(), self.port)).await?;
        Self::serve(listener, self.manager, token).await
    }

    pub async fn serve(
        listener: TcpListener,
        manager: Arc<Manager>,
        token: CancellationToken,
    ) -> std::io::Result<()> {
        info!(addr = %listener.local_addr()?, "serving manager api");
        axum::serve(listener, Self::router(manager))
            .with_graceful_shutdown(token.cancelled_owned())
            .await
    }
}

async fn get_tasks(AxumState(manager): AxumState<Arc<Manager>>) -> Json<Vec<Task>> {
    Json(manager.get_tasks().await)
}

async fn start_task(
    AxumState(manager): AxumState<Arc<Manager>>,
    body: Result<Json<TaskEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match body {
        Ok(event) => event,
        Err(rejection) => return decode_error(rejection).into_response(),
    };

    let task = event.task.clone();
    manager.add_task(event).await;
    info!(task_id = %task.id, "added task");
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn missing_task_id() -> ErrResponse {
    ErrResponse::new(StatusCode::BAD_REQUEST, "taskID was not supplied")
}

async fn stop_task(AxumState(manager): AxumState<Arc<Manager>>, Path(id): Path<String>) -> Response {
    if id.trim().is_empty() {
        return missing_task_id().await.into_response();
    }

    let found = match Uuid::parse_str(&id) {
        Ok(task_id) => manager.get_task(&task_id).await,
        Err(_) => None,
    };
    let Some(mut task) = found else {
        return ErrResponse::new(StatusCode::NOT_FOUND, format!("no task with ID {id} found"))
            .into_response();
    };

    task.state = State::Completed;
    let task_id = task.id;
    manager.add_task(TaskEvent::new(State::Completed, task)).await;
    info!(task_id = %task_id, "added stop event for task");
    StatusCode::NO_CONTENT.into_response()
}
