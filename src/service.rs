//! Assistant service — startup and the message exchange loop.
//!
//! One exchange: append the user's message, start a run, poll it, answer any
//! tool calls, poll again, and return the reply that run wrote. The whole
//! wait is bounded by `ExchangeConfig::run_timeout`; dropping the returned
//! future abandons the exchange and releases the user's session.

use std::sync::{Arc, OnceLock};

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::assistant::{
    AssistantApi, AssistantDefinition, AzureAssistantClient, Run, RunStatus,
};
use crate::booking::BookingGateway;
use crate::config::{AppConfig, ExchangeConfig};
use crate::error::{AssistantError, Error, ExchangeError};
use crate::secrets::SecretStore;
use crate::session::SessionStore;
use crate::tools::{ToolDispatcher, available_tools};

/// Long-lived handle to the hosted assistant.
pub struct AssistantService {
    api: Arc<dyn AssistantApi>,
    dispatcher: ToolDispatcher,
    sessions: Arc<SessionStore>,
    config: ExchangeConfig,
    assistant_id: OnceLock<String>,
}

impl AssistantService {
    /// Create an uninitialized service. `initialize` must succeed before
    /// `get_response` does anything.
    pub fn new(
        api: Arc<dyn AssistantApi>,
        dispatcher: ToolDispatcher,
        sessions: Arc<SessionStore>,
        config: ExchangeConfig,
    ) -> Self {
        Self {
            api,
            dispatcher,
            sessions,
            config,
            assistant_id: OnceLock::new(),
        }
    }

    /// Create the assistant definition on the service. Idempotent.
    pub async fn initialize(&self, definition: &AssistantDefinition) -> Result<(), Error> {
        if self.is_initialized() {
            return Ok(());
        }
        let id = self.api.create_assistant(definition).await?;
        if self.assistant_id.set(id).is_err() {
            warn!("Assistant initialized concurrently; keeping the first definition");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.assistant_id.get().is_some()
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.get().map(String::as_str)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Send `message` on behalf of `user_id` and return the assistant's reply.
    pub async fn get_response(&self, message: &str, user_id: Option<&str>) -> Result<String, Error> {
        let assistant_id = self
            .assistant_id
            .get()
            .ok_or(ExchangeError::NotInitialized)?;

        let lease = self
            .sessions
            .acquire(user_id, || self.api.create_thread())
            .await?;
        let thread_id = lease.thread_id();

        self.api.add_user_message(thread_id, message).await?;
        let run = self.api.create_run(thread_id, assistant_id).await?;
        info!(
            thread_id,
            run_id = %run.id,
            user_id = user_id.unwrap_or("-"),
            "Started assistant run"
        );

        let run = self.drive_with_deadline(thread_id, run).await?;

        match run.status {
            RunStatus::Completed => self.latest_reply(thread_id, &run.id).await,
            status => {
                let detail = run.last_error.as_ref().map(ToString::to_string);
                warn!(
                    thread_id,
                    run_id = %run.id,
                    status = %status,
                    detail = detail.as_deref().unwrap_or("-"),
                    "Assistant run did not complete"
                );
                Err(ExchangeError::RunFailed {
                    status: status.to_string(),
                    detail,
                }
                .into())
            }
        }
    }

    /// Drive a run to a terminal status within `run_timeout`, cancelling it
    /// remotely when the deadline passes.
    async fn drive_with_deadline(&self, thread_id: &str, run: Run) -> Result<Run, Error> {
        let run_id = run.id.clone();
        let timeout = self.config.run_timeout;

        match tokio::time::timeout(timeout, self.drive(thread_id, run)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(thread_id, run_id = %run_id, ?timeout, "Assistant run timed out; cancelling");
                self.cancel(thread_id, &run_id).await;
                Err(ExchangeError::RunTimeout { run_id, timeout }.into())
            }
        }
    }

    async fn drive(&self, thread_id: &str, run: Run) -> Result<Run, Error> {
        let mut run = self.wait(thread_id, run).await?;
        let mut rounds = 0;

        while run.status == RunStatus::RequiresAction {
            let calls = run.pending_tool_calls();
            if calls.is_empty() {
                // Nothing we can answer; the caller reports the status.
                self.cancel(thread_id, &run.id).await;
                break;
            }
            if rounds == self.config.max_tool_rounds {
                warn!(thread_id, run_id = %run.id, rounds, "Too many tool rounds; cancelling");
                self.cancel(thread_id, &run.id).await;
                return Err(ExchangeError::ToolRoundsExceeded {
                    run_id: run.id.clone(),
                    max: self.config.max_tool_rounds,
                }
                .into());
            }
            rounds += 1;

            debug!(thread_id, run_id = %run.id, calls = calls.len(), round = rounds, "Run requires action");
            let outputs = self.dispatcher.execute_all(calls).await;
            let submitted = self
                .api
                .submit_tool_outputs(thread_id, &run.id, &outputs)
                .await?;
            run = self.wait(thread_id, submitted).await?;
        }

        Ok(run)
    }

    /// Poll while the service is still working on the run.
    async fn wait(&self, thread_id: &str, mut run: Run) -> Result<Run, AssistantError> {
        while run.status.is_pending() {
            tokio::time::sleep(self.config.poll_interval).await;
            run = self.api.get_run(thread_id, &run.id).await?;
        }
        Ok(run)
    }

    /// Best-effort remote cancel so the thread is free for the next message.
    async fn cancel(&self, thread_id: &str, run_id: &str) {
        if let Err(e) = self.api.cancel_run(thread_id, run_id).await {
            warn!(thread_id, run_id, error = %e, "Failed to cancel run");
        }
    }

    /// Newest assistant text written by `run_id`.
    async fn latest_reply(&self, thread_id: &str, run_id: &str) -> Result<String, Error> {
        let messages = self.api.list_messages(thread_id).await?;
        messages
            .iter()
            .filter(|m| m.role == "assistant" && m.run_id.as_deref() == Some(run_id))
            .find_map(|m| m.text())
            .map(str::to_string)
            .ok_or_else(|| {
                ExchangeError::EmptyResponse {
                    run_id: run_id.to_string(),
                }
                .into()
            })
    }
}

/// Resolve the API key, build the Azure client, and create the assistant.
pub async fn bootstrap(
    config: &AppConfig,
    secrets: &dyn SecretStore,
) -> Result<AssistantService, Error> {
    bootstrap_with(config, secrets, |api_key| {
        let client: Arc<dyn AssistantApi> = Arc::new(AzureAssistantClient::new(
            &config.endpoint,
            &config.api_version,
            api_key,
        ));
        client
    })
    .await
}

/// `bootstrap` with a caller-supplied assistant client.
///
/// The secret is resolved first; if that fails nothing else is touched.
pub async fn bootstrap_with<F>(
    config: &AppConfig,
    secrets: &dyn SecretStore,
    make_api: F,
) -> Result<AssistantService, Error>
where
    F: FnOnce(SecretString) -> Arc<dyn AssistantApi>,
{
    let api_key = secrets.get_secret(&config.api_key_secret_name).await?;
    info!(vault = secrets.vault(), "Resolved assistant API key");

    let api = make_api(api_key);
    let service = AssistantService::new(
        api,
        ToolDispatcher::new(BookingGateway::new(&config.booking_api_url)),
        Arc::new(SessionStore::new(config.sessions.clone())),
        config.exchange.clone(),
    );

    let today = chrono::Local::now().date_naive();
    let definition = AssistantDefinition::cafe(&config.deployment, today, available_tools());
    service.initialize(&definition).await?;
    info!(
        assistant_id = service.assistant_id().unwrap_or("-"),
        deployment = %config.deployment,
        "Assistant ready"
    );

    Ok(service)
}
