//! Hosted assistant integration.
//!
//! `AssistantApi` is the seam between the exchange loop and the hosted
//! service. `AzureAssistantClient` talks to Azure OpenAI's Assistants REST
//! API; tests substitute scripted implementations.

pub mod client;
pub mod definition;
pub mod types;

pub use client::AzureAssistantClient;
pub use definition::AssistantDefinition;
pub use types::{Run, RunStatus, ThreadMessage, ToolCall, ToolOutput};

use async_trait::async_trait;

use crate::error::AssistantError;

/// Operations used against the hosted assistant service.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create the assistant definition. Returns its id.
    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<String, AssistantError>;

    /// Create an empty conversation thread. Returns its id.
    async fn create_thread(&self) -> Result<String, AssistantError>;

    /// Append a user message to a thread.
    async fn add_user_message(&self, thread_id: &str, content: &str)
    -> Result<(), AssistantError>;

    /// Start a run of `assistant_id` over a thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
    -> Result<Run, AssistantError>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    /// Submit all tool outputs for a run waiting in `requires_action`.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AssistantError>;

    /// Ask the service to cancel a run.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    /// List thread messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError>;
}
