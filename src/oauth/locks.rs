use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::Identity;

/// One async mutex per identity. Held across hydrate, mutate and persist so
/// concurrent requests from the same session do not race on the blob.
#[derive(Debug, Clone, Default)]
pub struct IdentityLocks {
    locks: Arc<Mutex<HashMap<Identity, Arc<AsyncMutex<()>>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, identity: &Identity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop locks nobody holds or waits on
            locks.retain(|id, l| id == identity || Arc::strong_count(l) > 1);
            locks
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_identity_is_serialized() {
        let locks = IdentityLocks::new();
        let u1 = Identity::new("u1");
        let guard = locks.lock(&u1).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&u1)).await;
        assert!(second.is_err(), "second lock should wait");

        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(&u1)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_identities_do_not_block() {
        let locks = IdentityLocks::new();
        let _g1 = locks.lock(&Identity::new("u1")).await;
        let g2 = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(&Identity::new("u2")),
        )
        .await;
        assert!(g2.is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = IdentityLocks::new();
        drop(locks.lock(&Identity::new("u1")).await);
        drop(locks.lock(&Identity::new("u2")).await);
        assert_eq!(locks.tracked(), 1);
    }
}
