//! Executor client.
//!
//! `ExecutorClient` is the seam between the lifecycle worker and the remote
//! executor. `HttpExecutorClient` talks to the executor's REST API; tests and
//! offline runs use [`MockExecutor`](crate::execution::MockExecutor).

use crate::config::ExecutorSettings;
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::protocol::{AckResponse, ContinuousStatus, ErrorBody, RunResponse};
use crate::execution::request::ExecutionRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Operations offered by a remote executor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutorClient: Send + Sync {
    /// Execute the request once and wait for its result.
    async fn run_once(&self, request: &ExecutionRequest) -> ExecutionResult<RunResponse>;

    /// Ask the executor to run the request repeatedly.
    async fn start_continuous(&self, request: &ExecutionRequest) -> ExecutionResult<AckResponse>;

    async fn stop_continuous(&self) -> ExecutionResult<AckResponse>;

    async fn continuous_status(&self) -> ExecutionResult<ContinuousStatus>;

    /// Raw `GET /nodes` listing, parsed by `NodeCatalog::from_listing`.
    async fn list_node_kinds(&self) -> ExecutionResult<Value>;
}

/// REST client for the executor service.
#[derive(Debug, Clone)]
pub struct HttpExecutorClient {
    base_url: String,
    client: Client,
}

impl HttpExecutorClient {
    pub fn new(settings: &ExecutorSettings) -> ExecutionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .build()
            .map_err(|e| {
                ExecutionError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ExecutionResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => error.message(),
                Err(_) if body.is_empty() => status.to_string(),
                Err(_) => body,
            };
            return Err(ExecutionError::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }
        response.json::<T>().await.map_err(map_http_error)
    }
}

/// Maps a reqwest error to an `ExecutionError`.
fn map_http_error(error: reqwest::Error) -> ExecutionError {
    if error.is_timeout() {
        ExecutionError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ExecutionError::Transport(format!("Connection error: {}", error))
    } else if error.is_decode() {
        ExecutionError::Decode(error.to_string())
    } else {
        ExecutionError::Transport(format!("HTTP error: {}", error))
    }
}

#[async_trait]
impl ExecutorClient for HttpExecutorClient {
    #[tracing::instrument(skip_all, fields(request_id = %request.metadata.id))]
    async fn run_once(&self, request: &ExecutionRequest) -> ExecutionResult<RunResponse> {
        tracing::debug!("Submitting {} node(s) to {}", request.nodes.len(), self.base_url);
        let response = self
            .client
            .post(self.url("/run"))
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        Self::decode(response).await
    }

    #[tracing::instrument(skip_all, fields(request_id = %request.metadata.id))]
    async fn start_continuous(&self, request: &ExecutionRequest) -> ExecutionResult<AckResponse> {
        tracing::debug!("Starting continuous execution on {}", self.base_url);
        let response = self
            .client
            .post(self.url("/continuous/start"))
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        Self::decode(response).await
    }

    async fn stop_continuous(&self) -> ExecutionResult<AckResponse> {
        let response = self
            .client
            .post(self.url("/continuous/stop"))
            .send()
            .await
            .map_err(map_http_error)?;
        Self::decode(response).await
    }

    async fn continuous_status(&self) -> ExecutionResult<ContinuousStatus> {
        let response = self
            .client
            .get(self.url("/continuous/status"))
            .send()
            .await
            .map_err(map_http_error)?;
        Self::decode(response).await
    }

    async fn list_node_kinds(&self) -> ExecutionResult<Value> {
        let response = self
            .client
            .get(self.url("/nodes"))
            .send()
            .await
            .map_err(map_http_error)?;
        Self::decode(response).await
    }
}
