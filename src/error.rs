//! Error types for Booking Assist.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret store error: {0}")]
    Secret(#[from] SecretError),

    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Secret store errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential available for {scope}: {reason}")]
    Credential { scope: String, reason: String },

    #[error("Secret store {vault} unreachable: {reason}")]
    Unreachable { vault: String, reason: String },

    #[error("Secret {name} not found in {vault}")]
    NotFound { vault: String, name: String },

    #[error("Secret store {vault} returned an invalid response: {reason}")]
    InvalidResponse { vault: String, reason: String },
}

/// Assistant service (REST) errors.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Request to {operation} failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

/// Booking gateway errors. Never surfaced to callers: the tool dispatcher
/// turns them into an error payload for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Booking service returned HTTP {status} with an unreadable body: {reason}")]
    InvalidResponse { status: u16, reason: String },
}

/// Tool-call errors, also converted into error payloads.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Unknown tool: {name}")]
    Unknown { name: String },
}

/// Errors from one message exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Assistant service is not initialized")]
    NotInitialized,

    #[error("Assistant run failed with status: {status}{}", detail_suffix(.detail))]
    RunFailed {
        status: String,
        detail: Option<String>,
    },

    #[error("Assistant run {run_id} did not finish within {timeout:?}")]
    RunTimeout { run_id: String, timeout: Duration },

    #[error("Assistant run {run_id} requested tools more than {max} times")]
    ToolRoundsExceeded { run_id: String, max: usize },

    #[error("Assistant run {run_id} completed without a text reply")]
    EmptyResponse { run_id: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(" - {d}")).unwrap_or_default()
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
