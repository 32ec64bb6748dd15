//! Azure Key Vault secret store.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AzureCredential, SecretStore};
use crate::error::SecretError;

const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";
const KEY_VAULT_API_VERSION: &str = "7.4";

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: Option<String>,
}

/// Reads secrets from `https://{vault}.vault.azure.net/secrets/{name}`.
pub struct KeyVaultStore {
    vault_url: String,
    credential: AzureCredential,
    client: reqwest::Client,
}

impl KeyVaultStore {
    pub fn new(vault_url: impl Into<String>, credential: AzureCredential) -> Self {
        Self {
            vault_url: vault_url.into().trim_end_matches('/').to_string(),
            credential,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SecretStore for KeyVaultStore {
    fn vault(&self) -> &str {
        &self.vault_url
    }

    async fn get_secret(&self, name: &str) -> Result<SecretString, SecretError> {
        let token = self.credential.token(&self.client, KEY_VAULT_RESOURCE).await?;

        let response = self
            .client
            .get(format!("{}/secrets/{}", self.vault_url, name))
            .query(&[("api-version", KEY_VAULT_API_VERSION)])
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SecretError::Unreachable {
                vault: self.vault_url.clone(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(SecretError::NotFound {
                    vault: self.vault_url.clone(),
                    name: name.to_string(),
                });
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(SecretError::Unreachable {
                    vault: self.vault_url.clone(),
                    reason: format!("HTTP {status}: {body}"),
                });
            }
            _ => {}
        }

        let bundle: SecretBundle =
            response
                .json()
                .await
                .map_err(|e| SecretError::InvalidResponse {
                    vault: self.vault_url.clone(),
                    reason: e.to_string(),
                })?;

        let value = bundle.value.ok_or_else(|| SecretError::NotFound {
            vault: self.vault_url.clone(),
            name: name.to_string(),
        })?;

        tracing::info!(vault = %self.vault_url, secret = name, "Resolved secret from Key Vault");
        Ok(SecretString::from(value))
    }
}
