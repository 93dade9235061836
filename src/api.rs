use std::sync::Arc;

use reqwest::{Method, StatusCode};

use crate::client::FederationClient;
use crate::error::AuthError;
use crate::session::SessionStorage;
use crate::types::{AccessToken, Identity};

/// What the request handler should do after a downstream call.
#[derive(Debug)]
pub enum ApiOutcome {
    /// The API answered successfully; the body parsed as JSON, or `Null` if empty.
    Success(serde_json::Value),
    /// No usable token: send the user through interactive sign-in.
    SignInRequired,
    /// The API refused a token that looked valid. The cached entry has been
    /// purged; the user should be told to sign in again.
    Unauthorized,
    /// Any other failure talking to the API.
    Failed {
        status: Option<u16>,
        detail: String,
    },
}

/// Map a non-401 downstream response to an outcome. A body that could not be
/// read is a failure whatever the status said.
fn classify_response(status: StatusCode, body: Result<String, String>) -> ApiOutcome {
    let text = match body {
        Ok(text) => text,
        Err(e) => {
            return ApiOutcome::Failed {
                status: Some(status.as_u16()),
                detail: format!("Failed to read response body: {e}"),
            }
        }
    };
    if !status.is_success() {
        return ApiOutcome::Failed {
            status: Some(status.as_u16()),
            detail: text,
        };
    }
    if text.trim().is_empty() {
        return ApiOutcome::Success(serde_json::Value::Null);
    }
    match serde_json::from_str(&text) {
        Ok(value) => ApiOutcome::Success(value),
        Err(e) => ApiOutcome::Failed {
            status: Some(status.as_u16()),
            detail: format!("Response was not JSON: {e}"),
        },
    }
}

/// Calls the downstream API on behalf of a signed-in user.
pub struct ProtectedApi {
    federation: Arc<FederationClient>,
    http: reqwest::Client,
    base_address: String,
}

impl ProtectedApi {
    pub fn new(federation: Arc<FederationClient>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(federation.config().request_timeout())
            .build()
            .map_err(|e| AuthError::ConfigError {
                path: "<http>".into(),
                detail: format!("Cannot build HTTP client: {e}"),
            })?;
        let base_address = federation
            .config()
            .base_address
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            federation,
            http,
            base_address,
        })
    }

    pub async fn get_json(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        path: &str,
    ) -> Result<ApiOutcome, AuthError> {
        self.send(session, identity, Method::GET, path, None).await
    }

    pub async fn post_json(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiOutcome, AuthError> {
        self.send(session, identity, Method::POST, path, Some(body))
            .await
    }

    async fn send(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiOutcome, AuthError> {
        let token = match self.federation.acquire_token(session.clone(), identity).await {
            Ok(token) => token,
            Err(AuthError::InteractionRequired { .. }) => return Ok(ApiOutcome::SignInRequired),
            Err(e) => return Err(e),
        };

        let response = match self.call(&token, method, path, body).await {
            Ok(response) => response,
            Err(e) => {
                return Ok(ApiOutcome::Failed {
                    status: None,
                    detail: e.to_string(),
                })
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Downstream API rejected the token for {identity}");
            self.federation.on_unauthorized(session, identity).await?;
            return Ok(ApiOutcome::Unauthorized);
        }

        let body = response.text().await.map_err(|e| e.to_string());
        Ok(classify_response(status, body))
    }

    async fn call(
        &self,
        token: &AccessToken,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/{}", self.base_address, path.trim_start_matches('/'));
        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, token.bearer_header());
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}
