use std::time::Duration;

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::AuthError;

/// Subset of the OpenID Connect discovery document this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Accept either the full discovery document address or the authority it
/// hangs off.
pub fn metadata_url(address: &str) -> String {
    if address.contains("/.well-known/") {
        address.to_string()
    } else {
        format!(
            "{}/.well-known/openid-configuration",
            address.trim_end_matches('/')
        )
    }
}

pub async fn fetch_metadata(address: &str, timeout: Duration) -> Result<OidcMetadata, AuthError> {
    let url = metadata_url(address);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::Discovery(format!("Cannot build HTTP client: {e}")))?;

    let resp = client.get(&url).send().await.map_err(|e| {
        AuthError::Discovery(format!("Failed to fetch provider metadata from {url}: {e}"))
    })?;

    if !resp.status().is_success() {
        return Err(AuthError::Discovery(format!(
            "Provider metadata endpoint {url} returned status {}",
            resp.status()
        )));
    }

    resp.json().await.map_err(|e| {
        AuthError::Discovery(format!("Failed to parse provider metadata from {url}: {e}"))
    })
}

/// Lazily fetched, process-wide provider metadata. The document is read on
/// first use and kept for the life of the process; a failed fetch is retried
/// on the next call.
#[derive(Debug)]
pub struct ProviderMetadata {
    address: String,
    timeout: Duration,
    cell: OnceCell<OidcMetadata>,
}

impl ProviderMetadata {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
            cell: OnceCell::new(),
        }
    }

    /// Metadata known up front, e.g. from static configuration.
    pub fn fixed(metadata: OidcMetadata) -> Self {
        Self {
            address: String::new(),
            timeout: Duration::ZERO,
            cell: OnceCell::new_with(Some(metadata)),
        }
    }

    pub async fn get(&self) -> Result<&OidcMetadata, AuthError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!("Fetching provider metadata from {}", self.address);
                fetch_metadata(&self.address, self.timeout).await
            })
            .await
    }
}
