use std::sync::Arc;

use crate::error::AuthError;
use crate::types::Identity;

use super::SessionStorage;

const KEY_PREFIX: &str = "fedauth.tokens.";

/// Serialized form of every cached token held for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBlob(Vec<u8>);

impl SessionBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Per-identity token blobs kept in the host's session storage.
#[derive(Clone)]
pub struct SessionTokenStore {
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenStore").finish_non_exhaustive()
    }
}

impl SessionTokenStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn session_key(identity: &Identity) -> String {
        format!("{KEY_PREFIX}{identity}")
    }

    /// A missing blob is the normal first-use state and reads as `None`.
    pub async fn load(&self, identity: &Identity) -> Result<Option<SessionBlob>, AuthError> {
        let key = Self::session_key(identity);
        Ok(self.storage.get(&key).await?.map(SessionBlob::new))
    }

    pub async fn save(&self, identity: &Identity, blob: SessionBlob) -> Result<(), AuthError> {
        let key = Self::session_key(identity);
        self.storage.set(&key, blob.into_bytes()).await
    }

    /// Drop the identity's blob; called on sign-out or session expiry.
    pub async fn clear(&self, identity: &Identity) -> Result<(), AuthError> {
        let key = Self::session_key(identity);
        self.storage.remove(&key).await
    }
}
