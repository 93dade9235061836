use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessToken, ResourceId};

/// Token material cached for one (identity, resource) pair.
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct CachedToken {
    pub resource: ResourceId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl CachedToken {
    /// True once `now` is within `skew` of the stated expiry. Tokens without
    /// an expiry never expire on their own.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        match self.expires_at {
            Some(expires) => now + skew >= expires,
            None => false,
        }
    }

    pub fn access(&self) -> AccessToken {
        AccessToken::new(&self.access_token)
    }

    /// Merge a refresh response into this entry. Providers that do not rotate
    /// refresh tokens omit them, in which case the old one is kept.
    pub fn refreshed_with(&self, response: TokenResponse, now: DateTime<Utc>) -> CachedToken {
        let mut next = response.into_cached_token(self.resource.clone(), now);
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        if next.id_token.is_none() {
            next.id_token = self.id_token.clone();
        }
        next
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("resource", &self.resource)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl TokenResponse {
    pub fn into_cached_token(self, resource: ResourceId, now: DateTime<Utc>) -> CachedToken {
        let expires_at = self
            .expires_in
            .map(|secs| now + chrono::Duration::seconds(secs));
        CachedToken {
            resource,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            id_token: self.id_token,
            token_type: self.token_type,
        }
    }
}

/// Error payload returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => f.write_str(&self.error),
        }
    }
}
