use crate::error::AuthError;
use crate::oauth::cache::TokenCache;
use crate::oauth::locks::IdentityLocks;
use crate::session::SessionTokenStore;
use crate::types::{Identity, ResourceId};

/// Drops a cached token the downstream API refused, so the next silent
/// acquisition cannot hand it out again. Redirects and retries are left to
/// the caller.
pub struct UnauthorizedRecoveryHandler {
    store: SessionTokenStore,
    locks: IdentityLocks,
}

impl UnauthorizedRecoveryHandler {
    pub fn new(store: SessionTokenStore, locks: IdentityLocks) -> Self {
        Self { store, locks }
    }

    /// Returns whether an entry was removed. Safe to call repeatedly.
    pub async fn on_unauthorized(
        &self,
        identity: &Identity,
        resource: &ResourceId,
    ) -> Result<bool, AuthError> {
        let _guard = self.locks.lock(identity).await;
        let mut cache = TokenCache::hydrate(identity.clone(), self.store.clone()).await?;
        let removed = cache.remove(resource).await?;
        if removed {
            tracing::info!("Purged rejected token for {identity} targeting {resource}");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::oauth::token::CachedToken;
    use crate::session::MemorySession;

    #[tokio::test]
    async fn removes_only_the_rejected_resource() {
        let store = SessionTokenStore::new(Arc::new(MemorySession::new()));
        let u1 = Identity::new("u1");
        let mut cache = TokenCache::hydrate(u1.clone(), store.clone()).await.unwrap();
        for resource in ["api", "graph"] {
            cache
                .put(CachedToken {
                    resource: ResourceId::new(resource),
                    access_token: format!("{resource}-token"),
                    refresh_token: None,
                    expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
                    id_token: None,
                    token_type: "Bearer".into(),
                })
                .await
                .unwrap();
        }

        let handler = UnauthorizedRecoveryHandler::new(store.clone(), IdentityLocks::new());
        assert!(handler.on_unauthorized(&u1, &ResourceId::new("api")).await.unwrap());

        let cache = TokenCache::hydrate(u1, store).await.unwrap();
        assert!(cache.find(&ResourceId::new("api")).is_none());
        assert!(cache.find(&ResourceId::new("graph")).is_some());
    }

    #[tokio::test]
    async fn twice_without_entry_is_noop() {
        let session = Arc::new(MemorySession::new());
        let handler = UnauthorizedRecoveryHandler::new(
            SessionTokenStore::new(session.clone()),
            IdentityLocks::new(),
        );
        let u1 = Identity::new("u1");
        let api = ResourceId::new("api");
        assert!(!handler.on_unauthorized(&u1, &api).await.unwrap());
        assert!(!handler.on_unauthorized(&u1, &api).await.unwrap());
        assert_eq!(session.write_count(), 0);
    }
}
