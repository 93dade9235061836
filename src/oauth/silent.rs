use std::sync::Arc;

use chrono::Utc;

use crate::error::AuthError;
use crate::oauth::cache::TokenCache;
use crate::oauth::endpoint::{Grant, TokenEndpoint};
use crate::oauth::locks::IdentityLocks;
use crate::session::SessionTokenStore;
use crate::types::{AccessToken, ClientCredential, Identity, ResourceId};

/// Default margin before the stated expiry at which a token counts as expired.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 300;

/// Returns a usable access token without user interaction: from the cache,
/// or by redeeming the cached refresh token.
pub struct SilentTokenProvider {
    endpoint: Arc<dyn TokenEndpoint>,
    store: SessionTokenStore,
    locks: IdentityLocks,
    clock_skew: chrono::Duration,
}

impl SilentTokenProvider {
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        store: SessionTokenStore,
        locks: IdentityLocks,
    ) -> Self {
        Self {
            endpoint,
            store,
            locks,
            clock_skew: chrono::Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    pub fn with_clock_skew(mut self, skew: chrono::Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Fails with `InteractionRequired` when nothing is cached for the pair, or
    /// the cached token is expired and cannot be refreshed.
    pub async fn acquire_silent(
        &self,
        identity: &Identity,
        resource: &ResourceId,
        credential: &ClientCredential,
    ) -> Result<AccessToken, AuthError> {
        let _guard = self.locks.lock(identity).await;
        let mut cache = TokenCache::hydrate(identity.clone(), self.store.clone()).await?;

        let Some(cached) = cache.find(resource).cloned() else {
            tracing::debug!("No cached token for {identity} targeting {resource}");
            return Err(AuthError::interaction_required(resource.as_str()));
        };

        let now = Utc::now();
        if !cached.is_expired_at(now, self.clock_skew) {
            tracing::debug!("Cache hit for {identity} targeting {resource}");
            return Ok(cached.access());
        }

        let Some(refresh_token) = cached.refresh_token.as_deref() else {
            tracing::debug!("Expired token for {identity} has no refresh token");
            cache.remove(resource).await?;
            return Err(AuthError::interaction_required(resource.as_str()));
        };

        let refreshed = self
            .endpoint
            .exchange(Grant::RefreshToken { refresh_token }, credential, resource)
            .await;

        match refreshed {
            Ok(response) => {
                let next = cached.refreshed_with(response, Utc::now());
                let access = next.access();
                cache.put(next).await?;
                tracing::info!("Refreshed token for {identity} targeting {resource}");
                Ok(access)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed for {identity} targeting {resource}: {e}");
                cache.remove(resource).await?;
                Err(AuthError::interaction_required(resource.as_str()))
            }
        }
    }
}
