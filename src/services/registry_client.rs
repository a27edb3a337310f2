use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::models::registry::RegistryMetadata;
use crate::utils::config::Config;
use crate::utils::error::{CliError, Result};
use crate::utils::validation::validate_npm_package_name;

/// Registry API client for command-package metadata
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// HTTP client for registry requests
    client: Client,
    /// Base URL for the registry, without a trailing slash
    registry_url: String,
    /// User agent string for requests
    user_agent: String,
}

impl RegistryClient {
    /// Create a client for the registry selected in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::with_registry_url(config.registry_url())
    }

    /// Create a client with a custom registry URL (also used for testing)
    pub fn with_registry_url(registry_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), registry_url)
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(client: Client, registry_url: impl Into<String>) -> Self {
        Self {
            client,
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            user_agent: format!("scaffold/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// URL of a package document; the scope separator is percent-encoded
    pub fn package_url(&self, package_name: &str) -> String {
        format!("{}/{}", self.registry_url, package_name.replace('/', "%2F"))
    }

    /// Fetch the package document.
    ///
    /// Returns `Ok(None)` without a request for an empty name, and `Ok(None)`
    /// when the registry answers with any non-success status. Transport
    /// failures are returned as [`CliError::RegistryUnreachable`] and are
    /// not retried.
    pub async fn fetch_metadata(&self, package_name: &str) -> Result<Option<RegistryMetadata>> {
        if package_name.is_empty() {
            return Ok(None);
        }
        validate_npm_package_name(package_name)?;

        let url = self.package_url(package_name);
        debug!(url = %url, "fetching registry metadata");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| CliError::RegistryUnreachable {
                url: url.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), package = package_name, "registry returned no data");
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| CliError::RegistryUnreachable {
                url: url.clone(),
                source,
            })?;

        serde_json::from_slice(&body).map(Some).map_err(|e| {
            CliError::MetadataUnavailable(format!("{package_name} (malformed registry response: {e})"))
        })
    }
}
