//! Azure identity — bearer tokens for Key Vault.
//!
//! Tries a service principal from the environment first
//! (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`), then falls
//! back to the managed identity endpoint available on Azure hosts.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::SecretError;

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

/// Where a token comes from.
#[derive(Debug, Clone)]
pub enum AzureCredential {
    /// OAuth2 client-credentials grant for a service principal.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: SecretString,
        authority_host: String,
    },
    /// Azure Instance Metadata Service.
    ManagedIdentity {
        endpoint: String,
        client_id: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AzureCredential {
    /// Pick a credential the way the Azure SDK default chain does, minus the
    /// developer-tool sources.
    pub fn from_env() -> Self {
        let tenant = std::env::var("AZURE_TENANT_ID").ok();
        let client = std::env::var("AZURE_CLIENT_ID").ok();
        let secret = std::env::var("AZURE_CLIENT_SECRET").ok();

        match (tenant, client, secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Self::ClientSecret {
                tenant_id,
                client_id,
                client_secret: SecretString::from(client_secret),
                authority_host: std::env::var("AZURE_AUTHORITY_HOST")
                    .unwrap_or_else(|_| AUTHORITY_HOST.to_string()),
            },
            (_, client_id, _) => Self::ManagedIdentity {
                endpoint: IMDS_TOKEN_URL.to_string(),
                client_id,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::ClientSecret { .. } => "client_secret",
            Self::ManagedIdentity { .. } => "managed_identity",
        }
    }

    /// Acquire an access token for `resource` (e.g. `https://vault.azure.net`).
    pub async fn token(
        &self,
        client: &reqwest::Client,
        resource: &str,
    ) -> Result<SecretString, SecretError> {
        let request = match self {
            Self::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority_host,
            } => {
                let scope = format!("{}/.default", resource.trim_end_matches('/'));
                let form = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.expose_secret()),
                    ("scope", scope.as_str()),
                ];
                client
                    .post(format!("{authority_host}/{tenant_id}/oauth2/v2.0/token"))
                    .form(&form)
            }
            Self::ManagedIdentity {
                endpoint,
                client_id,
            } => {
                let mut query = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
                if let Some(id) = client_id {
                    query.push(("client_id", id.as_str()));
                }
                client.get(endpoint).header("Metadata", "true").query(&query)
            }
        };

        let credential_error = |reason: String| SecretError::Credential {
            scope: resource.to_string(),
            reason: format!("{}: {}", self.kind(), reason),
        };

        let response = request
            .send()
            .await
            .map_err(|e| credential_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(credential_error(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| credential_error(format!("invalid token response: {e}")))?;

        tracing::debug!(credential = self.kind(), resource, "Acquired access token");
        Ok(SecretString::from(token.access_token))
    }
}
