use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::oauth::cache::TokenCache;
use crate::oauth::endpoint::{Grant, TokenEndpoint};
use crate::oauth::locks::IdentityLocks;
use crate::session::SessionTokenStore;
use crate::types::{AccessToken, ClientCredential, Identity, ResourceId};

/// Result of redeeming the sign-in authorization code.
#[derive(Debug, Clone)]
pub struct CodeRedemption {
    pub access_token: AccessToken,
    pub id_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Always `true`: the single-use code has been exchanged and the sign-in
    /// protocol handling must not try to redeem it again.
    pub code_redeemed: bool,
}

/// Exchanges the authorization code received at sign-in for the first token
/// pair and stores it in the user's token cache.
pub struct AuthorizationCodeRedeemer {
    endpoint: Arc<dyn TokenEndpoint>,
    store: SessionTokenStore,
    locks: IdentityLocks,
}

impl AuthorizationCodeRedeemer {
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        store: SessionTokenStore,
        locks: IdentityLocks,
    ) -> Self {
        Self {
            endpoint,
            store,
            locks,
        }
    }

    /// Redeem `code` once. Any failure is a `Redemption` error and nothing is
    /// cached; the code cannot be retried.
    ///
    /// The exchange and the cache write run on their own task. If the caller's
    /// request is dropped mid-flight the provider call still completes and the
    /// tokens land in the session.
    pub async fn redeem(
        &self,
        identity: &Identity,
        code: &str,
        redirect_uri: &str,
        credential: &ClientCredential,
        resource: &ResourceId,
    ) -> Result<CodeRedemption, AuthError> {
        let guard = self.locks.lock(identity).await;

        let endpoint = self.endpoint.clone();
        let store = self.store.clone();
        let identity = identity.clone();
        let code = code.to_string();
        let redirect_uri = redirect_uri.to_string();
        let credential = credential.clone();
        let resource = resource.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            redeem_and_store(
                endpoint.as_ref(),
                store,
                identity,
                &code,
                &redirect_uri,
                &credential,
                resource,
            )
            .await
        });

        task.await.map_err(|e| AuthError::Redemption {
            detail: format!("Code redemption task failed: {e}"),
        })?
    }
}

async fn redeem_and_store(
    endpoint: &dyn TokenEndpoint,
    store: SessionTokenStore,
    identity: Identity,
    code: &str,
    redirect_uri: &str,
    credential: &ClientCredential,
    resource: ResourceId,
) -> Result<CodeRedemption, AuthError> {
    let response = endpoint
        .exchange(
            Grant::AuthorizationCode { code, redirect_uri },
            credential,
            &resource,
        )
        .await
        .map_err(|e| {
            tracing::warn!("Authorization code redemption failed for {identity}: {e}");
            AuthError::Redemption {
                detail: e.to_string(),
            }
        })?;

    let token = response.into_cached_token(resource.clone(), Utc::now());
    let redemption = CodeRedemption {
        access_token: token.access(),
        id_token: token.id_token.clone(),
        expires_at: token.expires_at,
        code_redeemed: true,
    };

    let mut cache = TokenCache::hydrate(identity.clone(), store).await?;
    cache.put(token).await?;
    tracing::info!("Redeemed authorization code for {identity} targeting {resource}");

    Ok(redemption)
}
