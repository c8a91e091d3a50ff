//! HTTP client side of the manager/worker protocol.

use std::time::Duration;

use reqwest::StatusCode;
use uuid::Uuid;

use crate::api::ErrResponse;
use crate::tasks::types::{Task, TaskEvent};
use crate::worker::types::Stats;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("error connecting to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {message}")]
    Rejected {
        url: String,
        status: StatusCode,
        message: String,
    },

    #[error("unable to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProtocolError {
    /// True when the peer could not be reached, as opposed to the peer
    /// answering with an error.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Transport { .. })
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Clone)]
pub struct WorkerClient {
    http: reqwest::Client,
}

impl WorkerClient {
    pub fn new(timeout: Duration) -> ProtocolResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProtocolError::Client)?;
        Ok(WorkerClient { http })
    }

    /// `POST http://<worker>/tasks`. The worker echoes the task back.
    pub async fn submit(&self, worker: &str, event: &TaskEvent) -> ProtocolResult<Task> {
        let url = format!("http://{worker}/tasks");
        let response = self
            .http
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        if response.status() != StatusCode::CREATED {
            return Err(rejected(url, response).await);
        }
        response.json().await.map_err(|source| decode(&url, source))
    }

    /// `GET http://<worker>/tasks`.
    pub async fn list(&self, worker: &str) -> ProtocolResult<Vec<Task>> {
        let url = format!("http://{worker}/tasks");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        if !response.status().is_success() {
            return Err(rejected(url, response).await);
        }
        response.json().await.map_err(|source| decode(&url, source))
    }

    /// `DELETE http://<worker>/tasks/<id>`; the worker answers 204.
    pub async fn cancel(&self, worker: &str, task_id: Uuid) -> ProtocolResult<()> {
        let url = format!("http://{worker}/tasks/{task_id}");
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(rejected(url, response).await);
        }
        Ok(())
    }

    /// `GET <api>/stats`, where `api` already carries the scheme.
    pub async fn stats(&self, api: &str) -> ProtocolResult<Stats> {
        let url = format!("{api}/stats");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        if !response.status().is_success() {
            return Err(rejected(url, response).await);
        }
        response.json().await.map_err(|source| decode(&url, source))
    }

    /// Plain GET; `Ok(())` only on 200.
    pub async fn probe(&self, url: &str) -> ProtocolResult<()> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| transport(url, source))?;

        if response.status() != StatusCode::OK {
            return Err(rejected(url.to_string(), response).await);
        }
        Ok(())
    }
}

fn transport(url: &str, source: reqwest::Error) -> ProtocolError {
    ProtocolError::Transport {
        url: url.to_string(),
        source,
    }
}

fn decode(url: &str, source: reqwest::Error) -> ProtocolError {
    ProtocolError::Decode {
        url: url.to_string(),
        source,
    }
}

async fn rejected(url: String, response: reqwest::Response) -> ProtocolError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    ProtocolError::Rejected {
        url,
        status,
        message,
    }
}
