//! Azure OpenAI Assistants REST client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::AssistantApi;
use super::definition::AssistantDefinition;
use super::types::{Created, ListResponse, Run, ThreadMessage, ToolOutput};
use crate::error::AssistantError;

/// Upper bound on a single REST call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for `{endpoint}/openai/...?api-version=...`.
pub struct AzureAssistantClient {
    endpoint: String,
    api_version: String,
    api_key: SecretString,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl AzureAssistantClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            api_key,
            client: reqwest::Client::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/openai/{}", self.endpoint, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .timeout(self.request_timeout)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.api_key.expose_secret())
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, AssistantError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::RequestFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "Assistant API call failed");
            return Err(AssistantError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AssistantError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<T, AssistantError> {
        let builder = self.request(reqwest::Method::POST, path).json(body);
        self.send(operation, builder).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
    ) -> Result<T, AssistantError> {
        let builder = self.request(reqwest::Method::GET, path);
        self.send(operation, builder).await
    }
}

#[async_trait]
impl AssistantApi for AzureAssistantClient {
    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<String, AssistantError> {
        let created: Created = self
            .post("create_assistant", "assistants", definition)
            .await?;
        tracing::info!(assistant_id = %created.id, model = %definition.model, "Created assistant");
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, AssistantError> {
        let created: Created = self
            .post("create_thread", "threads", &serde_json::json!({}))
            .await?;
        tracing::debug!(thread_id = %created.id, "Created thread");
        Ok(created.id)
    }

    async fn add_user_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<(), AssistantError> {
        let _: Created = self
            .post(
                "create_message",
                &format!("threads/{thread_id}/messages"),
                &serde_json::json!({"role": "user", "content": content}),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError> {
        self.post(
            "create_run",
            &format!("threads/{thread_id}/runs"),
            &serde_json::json!({"assistant_id": assistant_id}),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.get("retrieve_run", &format!("threads/{thread_id}/runs/{run_id}"))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AssistantError> {
        self.post(
            "submit_tool_outputs",
            &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &serde_json::json!({"tool_outputs": outputs}),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.post(
            "cancel_run",
            &format!("threads/{thread_id}/runs/{run_id}/cancel"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        let builder = self
            .request(reqwest::Method::GET, &format!("threads/{thread_id}/messages"))
            .query(&[("order", "desc")]);
        let page: ListResponse<ThreadMessage> = self.send("list_messages", builder).await?;
        Ok(page.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    use crate::assistant::RunStatus;

    async fn start_stub() -> String {
        async fn create_thread(
            headers: HeaderMap,
            Query(q): Query<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some("sk-test")
                || q.get("api-version").map(String::as_str) != Some("2024-05-01-preview")
            {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": {"message": "bad key"}})),
                );
            }
            (StatusCode::OK, Json(serde_json::json!({"id": "thread_abc", "object": "thread"})))
        }

        async fn get_run(
            Path((thread, run)): Path<(String, String)>,
        ) -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "id": run,
                "thread_id": thread,
                "status": "failed",
                "last_error": {"code": "rate_limit_exceeded", "message": "slow down"}
            }))
        }

        async fn list_messages(Path(thread): Path<String>) -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "object": "list",
                "data": [
                    {"id": "m2", "thread_id": thread, "role": "assistant",
                     "content": [{"type": "text", "text": {"value": "Hello!", "annotations": []}}]},
                    {"id": "m1", "thread_id": thread, "role": "user",
                     "content": [{"type": "text", "text": {"value": "Hi", "annotations": []}}]}
                ]
            }))
        }

        async fn slow_run() -> Json<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({}))
        }

        let app = Router::new()
            .route("/openai/threads", post(create_thread))
            .route("/openai/threads/{thread}/runs", post(slow_run))
            .route("/openai/threads/{thread}/runs/{run}", get(get_run))
            .route("/openai/threads/{thread}/messages", get(list_messages));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn create_thread_sends_key_and_version() {
        let base = start_stub().await;
        let client = AzureAssistantClient::new(
            &base,
            "2024-05-01-preview",
            SecretString::from("sk-test"),
        );
        assert_eq!(client.create_thread().await.unwrap(), "thread_abc");

        let wrong = AzureAssistantClient::new(
            &base,
            "2024-05-01-preview",
            SecretString::from("sk-wrong"),
        );
        let err = wrong.create_thread().await.unwrap_err();
        assert!(matches!(err, AssistantError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn get_run_parses_last_error() {
        let base = start_stub().await;
        let client =
            AzureAssistantClient::new(&base, "2024-05-01-preview", SecretString::from("sk-test"));
        let run = client.get_run("thread_abc", "run_1").await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(
            run.last_error.unwrap().to_string(),
            "rate_limit_exceeded: slow down"
        );
    }

    #[tokio::test]
    async fn list_messages_returns_newest_first() {
        let base = start_stub().await;
        let client =
            AzureAssistantClient::new(&base, "2024-05-01-preview", SecretString::from("sk-test"));
        let messages = client.list_messages("thread_abc").await.unwrap();
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[0].text(), Some("Hello!"));
    }

    #[tokio::test]
    async fn unresponsive_endpoint_times_out() {
        let base = start_stub().await;
        let client =
            AzureAssistantClient::new(&base, "2024-05-01-preview", SecretString::from("sk-test"))
                .with_request_timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let err = client.create_run("thread_abc", "asst_1").await.unwrap_err();
        assert!(matches!(err, AssistantError::RequestFailed { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
