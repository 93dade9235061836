use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Url;

use crate::error::AuthError;
use crate::types::ResourceId;

/// Response type that returns the id token together with the code, so the
/// user is known by the time the code is redeemed.
pub const RESPONSE_TYPE: &str = "id_token code";

/// Where a failed sign-in sends the browser.
pub const ERROR_PATH: &str = "/Home/Error";

/// A prepared authorization request. `state` and `nonce` must be kept in the
/// user's session. `state` is checked by [`CallbackParams::authorization_code`];
/// `nonce` belongs to id token validation, which the host's sign-in
/// middleware performs.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub url: String,
    pub state: String,
    pub nonce: String,
}

fn random_token() -> String {
    let mut buf = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn build_sign_in_request(
    authorization_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    resource: &ResourceId,
) -> Result<SignInRequest, AuthError> {
    let state = random_token();
    let nonce = random_token();
    let url = Url::parse_with_params(
        authorization_endpoint,
        &[
            ("client_id", client_id),
            ("response_type", RESPONSE_TYPE),
            ("response_mode", "form_post"),
            ("redirect_uri", redirect_uri),
            ("resource", resource.as_str()),
            ("scope", "openid"),
            ("state", state.as_str()),
            ("nonce", nonce.as_str()),
        ],
    )
    .map_err(|e| {
        AuthError::Discovery(format!(
            "Invalid authorization endpoint '{authorization_endpoint}': {e}"
        ))
    })?;

    Ok(SignInRequest {
        url: url.into(),
        state,
        nonce,
    })
}

/// Parameters posted (or appended) to the callback path by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    /// Unvalidated; see [`SignInRequest`].
    pub id_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a form-encoded body or query string (with or without leading `?`).
    pub fn parse(encoded: &str) -> Self {
        let mut params = CallbackParams::default();
        let encoded = encoded.trim_start_matches('?');
        for (key, value) in url_pairs(encoded) {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "code" => params.code = Some(value),
                "id_token" => params.id_token = Some(value),
                "state" => params.state = Some(value),
                "error" => params.error = Some(value),
                "error_description" => params.error_description = Some(value),
                _ => {}
            }
        }
        params
    }

    /// Extract the authorization code, checking for a provider error and a
    /// state mismatch first.
    pub fn authorization_code(&self, expected_state: Option<&str>) -> Result<&str, AuthError> {
        if let Some(error) = &self.error {
            let detail = match &self.error_description {
                Some(desc) => format!("{error}: {desc}"),
                None => error.clone(),
            };
            return Err(AuthError::Redemption { detail });
        }
        if let Some(expected) = expected_state {
            if self.state.as_deref() != Some(expected) {
                return Err(AuthError::Redemption {
                    detail: "state parameter does not match the sign-in request".into(),
                });
            }
        }
        self.code.as_deref().ok_or_else(|| AuthError::Redemption {
            detail: "No authorization code found in callback".into(),
        })
    }
}

fn url_pairs(encoded: &str) -> Vec<(String, String)> {
    let Ok(url) = Url::parse(&format!("http://callback.invalid/?{encoded}")) else {
        return Vec::new();
    };
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Location of the generic sign-in failure page carrying `message`.
pub fn failure_location(message: &str) -> String {
    let mut url = match Url::parse("http://app.invalid") {
        Ok(url) => url,
        Err(_) => return ERROR_PATH.to_string(),
    };
    url.set_path(ERROR_PATH);
    url.query_pairs_mut().append_pair("message", message);
    format!("{}?{}", url.path(), url.query().unwrap_or_default())
}
