use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::oauth::discovery::ProviderMetadata;
use crate::oauth::token::{TokenErrorResponse, TokenResponse};
use crate::types::{ClientCredential, ResourceId};

/// The two grants this crate performs against the token endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
    RefreshToken { refresh_token: &'a str },
}

impl Grant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Why a grant failed. Never leaves the crate: callers see `AuthError`.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    #[error("token endpoint did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("provider rejected the grant ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Token endpoint seam. The HTTP implementation talks to the federation
/// service; tests substitute their own.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange(
        &self,
        grant: Grant<'_>,
        credential: &ClientCredential,
        resource: &ResourceId,
    ) -> Result<TokenResponse, GrantError>;
}

/// Form-encoded POSTs to the provider's token endpoint, bounded by a timeout.
#[derive(Debug)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
    metadata: Arc<ProviderMetadata>,
    timeout: Duration,
}

impl HttpTokenEndpoint {
    pub fn new(metadata: Arc<ProviderMetadata>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            metadata,
            timeout,
        }
    }

    async fn post(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, GrantError> {
        let token_endpoint = self
            .metadata
            .get()
            .await
            .map_err(|e| GrantError::Transport(e.to_string()))?
            .token_endpoint
            .clone();

        let resp = self
            .client
            .post(&token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| GrantError::Transport(format!("{token_endpoint}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GrantError::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|err| err.to_string())
                .unwrap_or(body);
            return Err(GrantError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| GrantError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange(
        &self,
        grant: Grant<'_>,
        credential: &ClientCredential,
        resource: &ResourceId,
    ) -> Result<TokenResponse, GrantError> {
        let mut form = vec![
            ("grant_type", grant.grant_type()),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("resource", resource.as_str()),
        ];
        match grant {
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code));
                form.push(("redirect_uri", redirect_uri));
            }
            Grant::RefreshToken { refresh_token } => {
                form.push(("refresh_token", refresh_token));
            }
        }

        tokio::time::timeout(self.timeout, self.post(&form))
            .await
            .map_err(|_| GrantError::Timeout(self.timeout))?
    }
}
