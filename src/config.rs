//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default Azure OpenAI API version for the Assistants endpoints.
pub const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Key Vault name (the `{name}` in `https://{name}.vault.azure.net`).
    pub key_vault_name: String,
    /// Name of the secret holding the Azure OpenAI API key.
    pub api_key_secret_name: String,
    /// Model deployment the assistant is bound to.
    pub deployment: String,
    /// Azure OpenAI endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// Azure OpenAI API version.
    pub api_version: String,
    /// Base URL of the booking service.
    pub booking_api_url: String,
    /// Port for the chat HTTP server.
    pub port: u16,
    /// Exchange tuning.
    pub exchange: ExchangeConfig,
    /// Session store tuning.
    pub sessions: SessionConfig,
}

/// Run polling and tool dispatch limits.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Delay between run status checks.
    pub poll_interval: Duration,
    /// Upper bound on waiting for a run to reach a terminal status.
    pub run_timeout: Duration,
    /// Maximum number of `requires_action` rounds per run.
    pub max_tool_rounds: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            run_timeout: Duration::from_secs(120),
            max_tool_rounds: 5,
        }
    }
}

/// Session eviction policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions idle longer than this are pruned.
    pub idle_timeout: Duration,
    /// Upper bound on stored sessions; least-recently-used are evicted first.
    pub max_sessions: usize,
    /// How often the prune task runs.
    pub prune_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3600), // 1 hour
            max_sessions: 10_000,
            prune_interval: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let exchange_defaults = ExchangeConfig::default();
        let session_defaults = SessionConfig::default();

        let poll_interval_ms = parse_env("BOOKING_ASSIST_POLL_INTERVAL_MS")?
            .unwrap_or(exchange_defaults.poll_interval.as_millis() as u64);
        let run_timeout_secs = parse_env("BOOKING_ASSIST_RUN_TIMEOUT_SECS")?
            .unwrap_or(exchange_defaults.run_timeout.as_secs());
        let idle_secs = parse_env("BOOKING_ASSIST_SESSION_IDLE_SECS")?
            .unwrap_or(session_defaults.idle_timeout.as_secs());

        Ok(Self {
            key_vault_name: required("KEY_VAULT_NAME")?,
            api_key_secret_name: required("OPENAI_API_SECRET_NAME")?,
            deployment: required("DEPLOYMENT_NAME")?,
            endpoint: required("OPENAI_ENDPOINT_URL")?,
            api_version: std::env::var("OPENAI_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            booking_api_url: required("API_URL")?,
            port: parse_env("BOOKING_ASSIST_PORT")?.unwrap_or(8080),
            exchange: ExchangeConfig {
                poll_interval: Duration::from_millis(poll_interval_ms),
                run_timeout: Duration::from_secs(run_timeout_secs),
                max_tool_rounds: parse_env("BOOKING_ASSIST_MAX_TOOL_ROUNDS")?
                    .unwrap_or(exchange_defaults.max_tool_rounds),
            },
            sessions: SessionConfig {
                idle_timeout: Duration::from_secs(idle_secs),
                max_sessions: parse_env("BOOKING_ASSIST_MAX_SESSIONS")?
                    .unwrap_or(session_defaults.max_sessions),
                ..session_defaults
            },
        })
    }

    /// Key Vault URL derived from the vault name.
    pub fn key_vault_url(&self) -> String {
        format!("https://{}.vault.azure.net", self.key_vault_name)
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polling_is_one_second_with_a_deadline() {
        let exchange = ExchangeConfig::default();
        assert_eq!(exchange.poll_interval, Duration::from_secs(1));
        assert!(exchange.run_timeout > exchange.poll_interval);
    }

    #[test]
    fn key_vault_url_uses_vault_name() {
        let config = AppConfig {
            key_vault_name: "cafe-kv".to_string(),
            api_key_secret_name: "openai-key".to_string(),
            deployment: "gpt-4o".to_string(),
            endpoint: "https://example.openai.azure.com".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            booking_api_url: "http://localhost:5000".to_string(),
            port: 8080,
            exchange: ExchangeConfig::default(),
            sessions: SessionConfig::default(),
        };
        assert_eq!(config.key_vault_url(), "https://cafe-kv.vault.azure.net");
    }

    #[test]
    fn parse_env_reports_invalid_values() {
        // Unique key so parallel tests don't collide.
        let key = "BOOKING_ASSIST_TEST_PARSE_ENV_INVALID";
        unsafe { std::env::set_var(key, "not-a-number") };
        let err = parse_env::<u64>(key).unwrap_err();
        unsafe { std::env::remove_var(key) };
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn parse_env_missing_is_none() {
        let parsed = parse_env::<u64>("BOOKING_ASSIST_TEST_DEFINITELY_UNSET").unwrap();
        assert!(parsed.is_none());
    }
}
