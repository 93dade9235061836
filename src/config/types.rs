use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ClientCredential, ResourceId};

/// Settings for the federation service and the downstream API, read once at
/// startup and handed to each component.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// OIDC metadata (discovery document) address of the federation service.
    pub discovery_doc: String,
    /// Identifier of the downstream API, as registered in the application group.
    pub resource_id: String,
    /// Base URL of the downstream API.
    pub base_address: String,
    #[serde(default)]
    pub public_origin: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: i64,
    #[serde(default)]
    pub require_https_metadata: bool,
}

fn default_callback_path() -> String {
    "/signin-oidc".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_clock_skew_secs() -> i64 {
    300
}

impl FederationConfig {
    pub fn credential(&self) -> ClientCredential {
        ClientCredential::new(&self.client_id, &self.client_secret)
    }

    pub fn resource(&self) -> ResourceId {
        ResourceId::new(&self.resource_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.clock_skew_secs)
    }

    /// Absolute redirect URI for the sign-in callback. Falls back to the
    /// bare callback path when no public origin is configured.
    pub fn redirect_uri(&self) -> String {
        match &self.public_origin {
            Some(origin) => format!(
                "{}/{}",
                origin.trim_end_matches('/'),
                self.callback_path.trim_start_matches('/')
            ),
            None => self.callback_path.clone(),
        }
    }

    /// Check required fields and URL schemes. Returns a human-readable reason
    /// on the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("discoveryDoc", &self.discovery_doc),
            ("resourceId", &self.resource_id),
            ("baseAddress", &self.base_address),
        ] {
            if value.trim().is_empty() {
                return Err(format!("'{name}' must not be empty"));
            }
        }
        let url = reqwest::Url::parse(&self.discovery_doc)
            .map_err(|e| format!("Invalid discoveryDoc '{}': {e}", self.discovery_doc))?;
        if self.require_https_metadata && url.scheme() != "https" {
            return Err(format!(
                "discoveryDoc must use https when requireHttpsMetadata is set: {}",
                self.discovery_doc
            ));
        }
        reqwest::Url::parse(&self.base_address)
            .map_err(|e| format!("Invalid baseAddress '{}': {e}", self.base_address))?;
        if !self.callback_path.starts_with('/') {
            return Err(format!(
                "callbackPath must start with '/': {}",
                self.callback_path
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FederationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationConfig")
            .field("client_id", &self.client_id)
            .field("callback_path", &self.callback_path)
            .field("discovery_doc", &self.discovery_doc)
            .field("resource_id", &self.resource_id)
            .field("base_address", &self.base_address)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish_non_exhaustive()
    }
}
