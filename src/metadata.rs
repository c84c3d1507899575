//! Instance identity resolution against the local metadata service.
//!
//! Identity fields are fetched once at startup from
//! `{base_url}/latest/self/host/{key}`. Failures are logged and degrade to
//! empty values; they never abort startup and are never retried.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::config::env_or;

/// Environment variable selecting the metadata service base URL.
pub const METADATA_URL_ENV: &str = "RANCHER_METADATA";

/// Base URL used when [`METADATA_URL_ENV`] is unset or empty.
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.250";

/// Default request timeout (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Key of the agent IP address.
pub const AGENT_IP_KEY: &str = "agent_ip";

/// Key of the environment UUID.
pub const ENVIRONMENT_UUID_KEY: &str = "environment_uuid";

const HOST_PATH: &str = "/latest/self/host/";

/// Errors raised while resolving a metadata key.
///
/// Only surfaced through [`MetadataResolver::fetch`]; [`MetadataResolver::resolve`]
/// logs them and reports the key as unresolved.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Building the client, connecting, or reading the body failed.
    #[error("metadata request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("metadata service returned {status} for '{key}'")]
    Status { key: String, status: u16 },
}

/// Instance identity resolved from the metadata service.
///
/// Fields are empty when resolution failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessIdentity {
    agent_ip: String,
    environment_uuid: String,
}

impl ProcessIdentity {
    /// Create an identity from known values.
    pub fn new(agent_ip: impl Into<String>, environment_uuid: impl Into<String>) -> Self {
        Self {
            agent_ip: agent_ip.into(),
            environment_uuid: environment_uuid.into(),
        }
    }

    pub fn agent_ip(&self) -> &str {
        &self.agent_ip
    }

    pub fn environment_uuid(&self) -> &str {
        &self.environment_uuid
    }

    /// Whether both identity fields were resolved.
    pub fn is_resolved(&self) -> bool {
        !self.agent_ip.is_empty() && !self.environment_uuid.is_empty()
    }
}

/// Client for the metadata service.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    client: Client,
    base_url: String,
}

impl MetadataResolver {
    /// Create a resolver for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    /// Returns [`MetadataError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetadataError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a resolver whose base URL comes from [`METADATA_URL_ENV`],
    /// falling back to [`DEFAULT_METADATA_URL`].
    pub fn from_env(timeout: Duration) -> Result<Self, MetadataError> {
        Self::new(env_or(METADATA_URL_ENV, DEFAULT_METADATA_URL), timeout)
    }

    /// Base URL of the metadata service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `key`.
    pub fn key_url(&self, key: &str) -> String {
        format!("{}{}{}", self.base_url.trim_end_matches('/'), HOST_PATH, key)
    }

    /// Fetch `key`, returning the response body verbatim.
    ///
    /// # Errors
    /// - [`MetadataError::Transport`] on connection, timeout or body read failure
    /// - [`MetadataError::Status`] on a non-2xx response
    pub async fn fetch(&self, key: &str) -> Result<String, MetadataError> {
        let url = self.key_url(key);
        tracing::debug!(url = %url, "Querying metadata service");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// Resolve `key`, returning `None` if it could not be obtained.
    ///
    /// The failure is logged; no retry is attempted.
    pub async fn resolve(&self, key: &str) -> Option<String> {
        match self.fetch(key).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, base_url = %self.base_url, error = %e, "Failed to resolve metadata");
                None
            }
        }
    }

    /// Resolve every identity field.
    pub async fn resolve_identity(&self) -> ProcessIdentity {
        let environment_uuid = self
            .resolve(ENVIRONMENT_UUID_KEY)
            .await
            .unwrap_or_default();
        let agent_ip = self.resolve(AGENT_IP_KEY).await.unwrap_or_default();

        tracing::info!(
            agent_ip = %agent_ip,
            environment_uuid = %environment_uuid,
            "Resolved instance identity"
        );

        ProcessIdentity {
            agent_ip,
            environment_uuid,
        }
    }
}
