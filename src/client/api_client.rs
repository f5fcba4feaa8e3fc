//! # Remote API Client
//!
//! The backend as seen by the offline core: one request per queued action
//! and a read endpoint per cached domain.
//!
//! `HttpApiClient` attaches the bearer token and an `Idempotency-Key`
//! header, bounds every request with the configured timeout, and logs each
//! request and its outcome.
//!
//! | Action            | Request                              |
//! |-------------------|--------------------------------------|
//! | `CLOCK_IN`        | `POST /api/attendance/clock-in`      |
//! | `CLOCK_OUT`       | `POST /api/attendance/clock-out`     |
//! | `START_TASK`      | `POST /api/tasks/{taskId}/start`     |
//! | `UPDATE_PROGRESS` | `PUT /api/tasks/{taskId}/progress`   |
//! | `COMPLETE_TASK`   | `POST /api/tasks/{taskId}/complete`  |
//! | collection        | `GET /api/{domain}`                  |

use crate::client::config::Config;
use crate::client::error::ApiError;
use crate::shared::{ActionType, QueuedAction, SharedError};
use futures_util::future::{BoxFuture, FutureExt};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Instant;
use tokio::sync::RwLock;

/// Header carrying the per-action idempotency key
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// The backend collaborator
pub trait RemoteApi: Send + Sync + std::fmt::Debug {
    /// Replay one queued action as a single request
    fn dispatch<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), ApiError>>;

    /// Fetch the current records of a domain collection
    fn fetch_collection<'a>(&'a self, domain: &'a str)
        -> BoxFuture<'a, Result<Vec<Value>, ApiError>>;
}

/// Method and path for a queued action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

/// Resolve the request an action is replayed as
pub fn endpoint_for(action: &QueuedAction) -> Result<Endpoint, ApiError> {
    let task_path = |suffix: &str| -> Result<String, ApiError> {
        let task_id = action.task_id().ok_or_else(|| {
            SharedError::validation(
                "taskId",
                format!("{} payload needs a taskId", action.action_type),
            )
        })?;
        Ok(format!("/api/tasks/{}/{}", path_segment("taskId", &task_id)?, suffix))
    };

    let (method, path) = match action.action_type {
        ActionType::ClockIn => (Method::POST, "/api/attendance/clock-in".to_string()),
        ActionType::ClockOut => (Method::POST, "/api/attendance/clock-out".to_string()),
        ActionType::StartTask => (Method::POST, task_path("start")?),
        ActionType::UpdateProgress => (Method::PUT, task_path("progress")?),
        ActionType::CompleteTask => (Method::POST, task_path("complete")?),
    };

    Ok(Endpoint { method, path })
}

/// `value` if it is safe to place in a URL path as a single segment
fn path_segment<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        let message = format!("invalid {} '{}'", field, value);
        return Err(SharedError::validation(field, message).into());
    }
    Ok(value)
}

fn collection_path(domain: &str) -> Result<String, ApiError> {
    Ok(format!("/api/{}", path_segment("domain", domain)?))
}

/// Accepts `[...]` or `{ "data": [...] }`
fn collection_records(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(ApiError::Decode {
                message: "expected a `data` array".to_string(),
            }),
        },
        _ => Err(ApiError::Decode {
            message: "expected a JSON array".to_string(),
        }),
    }
}

/// reqwest-backed `RemoteApi`
#[derive(Debug)]
pub struct HttpApiClient {
    config: Config,
    client: Client,
    token: RwLock<Option<String>>,
}

impl HttpApiClient {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.app().request_timeout())
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    /// Replace the session token (login / logout)
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn clear_token(&self) {
        self.set_token(None).await;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        configure: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.config.api_url(path);
        let mut request = configure(self.client.request(method.clone(), &url));
        if let Some(token) = self.token.read().await.clone() {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        tracing::debug!("{} {}", method, url);

        let response = request.send().await.map_err(|e| {
            let error = ApiError::from(e);
            tracing::warn!("{} {} failed: {}", method, url, error);
            error
        })?;

        let status = response.status();
        tracing::debug!("{} {} -> {} in {:?}", method, url, status, started.elapsed());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("{} {} rejected with {}", method, url, status);
            return Err(ApiError::status(status.as_u16(), body));
        }

        Ok(response)
    }
}

impl RemoteApi for HttpApiClient {
    fn dispatch<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            let endpoint = endpoint_for(action)?;
            let key = action.idempotency_key.to_string();

            self.send(endpoint.method, &endpoint.path, |request| {
                request
                    .header(IDEMPOTENCY_HEADER, key)
                    .json(&action.payload)
            })
            .await?;
            Ok(())
        }
        .boxed()
    }

    fn fetch_collection<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, ApiError>> {
        async move {
            let path = collection_path(domain)?;
            let response = self.send(Method::GET, &path, |request| request).await?;
            let body: Value = response.json().await?;
            collection_records(body)
        }
        .boxed()
    }
}
