//! Secret resolution — exchanges cloud identity credentials for API keys.

pub mod credential;
pub mod key_vault;

pub use credential::AzureCredential;
pub use key_vault::KeyVaultStore;

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SecretError;

/// A store that can resolve a secret by name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Vault identifier used in logs and errors.
    fn vault(&self) -> &str;

    /// Fetch the current value of a secret.
    async fn get_secret(&self, name: &str) -> Result<SecretString, SecretError>;
}

/// In-memory secret store, for local runs and tests.
pub struct StaticSecretStore {
    vault: String,
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new(vault: impl Into<String>) -> Self {
        Self {
            vault: vault.into(),
            secrets: HashMap::new(),
        }
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    fn vault(&self) -> &str {
        &self.vault
    }

    async fn get_secret(&self, name: &str) -> Result<SecretString, SecretError> {
        self.secrets
            .get(name)
            .map(|v| SecretString::from(v.clone()))
            .ok_or_else(|| SecretError::NotFound {
                vault: self.vault.clone(),
                name: name.to_string(),
            })
    }
}
