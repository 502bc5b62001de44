//! HTTP client for the remote task store

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{StoreReply, Task, TaskFilter, TaskId, TaskStore};
use crate::config::StoreConfig;
use crate::{Error, Result};

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    task: &'a str,
}

#[derive(Serialize)]
struct IdRequest<'a> {
    id: &'a str,
}

/// Task store reached over HTTP
#[derive(Clone)]
pub struct HttpTaskStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTaskStore {
    /// Create a client for the store at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout)
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and decode the `{message?, error?}` reply
    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<StoreReply> {
        tracing::debug!(path, "sending task store command");

        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, path, "task store request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            tracing::error!(status = %status, error = %message, path, "task store rejected command");
            return Err(Error::StoreRejected {
                status: status.as_u16(),
                message,
            });
        }

        let reply: StoreReply = response.json().await.map_err(|e| {
            tracing::error!(error = %e, path, "failed to parse task store reply");
            e
        })?;

        tracing::debug!(path, message = ?reply.message, "task store command accepted");
        Ok(reply)
    }
}

impl std::fmt::Debug for HttpTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTaskStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut request = self.client.get(self.url("/tasks"));
        if let Some(done) = filter.done_param() {
            request = request.query(&[("done", done)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "failed to list tasks");
            return Err(Error::StoreRejected {
                status: status.as_u16(),
                message: "Failed to load tasks.".to_string(),
            });
        }

        let tasks: Vec<Task> = response.json().await?;
        tracing::debug!(count = tasks.len(), ?filter, "fetched task snapshot");
        Ok(tasks)
    }

    async fn add(&self, name: &str) -> Result<StoreReply> {
        self.post("/add", &AddRequest { task: name }).await
    }

    async fn toggle(&self, id: &TaskId) -> Result<StoreReply> {
        self.post("/toggle", &IdRequest { id: id.as_str() }).await
    }

    async fn mark(&self, id: &TaskId) -> Result<StoreReply> {
        self.post("/mark", &IdRequest { id: id.as_str() }).await
    }

    async fn delete(&self, id: &TaskId) -> Result<StoreReply> {
        self.post("/delete", &IdRequest { id: id.as_str() }).await
    }

    async fn clear(&self) -> Result<StoreReply> {
        self.post("/clear", &serde_json::json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = HttpTaskStore::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5000");
        assert_eq!(store.url("/tasks"), "http://localhost:5000/tasks");
    }
}
