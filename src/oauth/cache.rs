use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::oauth::token::CachedToken;
use crate::session::{SessionBlob, SessionTokenStore};
use crate::types::{Identity, ResourceId};

const BLOB_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct BlobContents {
    version: u32,
    tokens: Vec<CachedToken>,
}

/// Encode entries as one session blob.
pub fn encode_entries(entries: &[CachedToken]) -> Result<SessionBlob, AuthError> {
    let contents = BlobContents {
        version: BLOB_VERSION,
        tokens: entries.to_vec(),
    };
    serde_json::to_vec(&contents)
        .map(SessionBlob::new)
        .map_err(|e| AuthError::Session(format!("Failed to serialize token cache: {e}")))
}

/// Decode a session blob. Anything unreadable decodes to no entries.
pub fn decode_entries(blob: &SessionBlob) -> Vec<CachedToken> {
    let contents: BlobContents = match serde_json::from_slice(blob.as_bytes()) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Discarding unreadable token cache blob: {e}");
            return Vec::new();
        }
    };
    if contents.version != BLOB_VERSION {
        tracing::warn!(
            "Discarding token cache blob with unknown version {}",
            contents.version
        );
        return Vec::new();
    }

    // One entry per resource; a later duplicate wins
    let mut entries: Vec<CachedToken> = Vec::with_capacity(contents.tokens.len());
    for token in contents.tokens {
        entries.retain(|t| t.resource != token.resource);
        entries.push(token);
    }
    entries
}

/// Working set of cached tokens for one identity, written through to the
/// session token store on every mutation.
#[derive(Debug)]
pub struct TokenCache {
    identity: Identity,
    store: SessionTokenStore,
    entries: Vec<CachedToken>,
}

impl TokenCache {
    /// Load the identity's blob from the store.
    pub async fn hydrate(identity: Identity, store: SessionTokenStore) -> Result<Self, AuthError> {
        let entries = match store.load(&identity).await? {
            Some(blob) => decode_entries(&blob),
            None => Vec::new(),
        };
        tracing::debug!(
            "Hydrated token cache for {identity} with {} entries",
            entries.len()
        );
        Ok(Self {
            identity,
            store,
            entries,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn find(&self, resource: &ResourceId) -> Option<&CachedToken> {
        self.entries.iter().find(|t| &t.resource == resource)
    }

    pub fn entries(&self) -> &[CachedToken] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the entry for the token's resource.
    pub async fn put(&mut self, token: CachedToken) -> Result<(), AuthError> {
        let mut next: Vec<CachedToken> = self
            .entries
            .iter()
            .filter(|t| t.resource != token.resource)
            .cloned()
            .collect();
        next.push(token);
        self.commit(next).await
    }

    /// Remove the entry for `resource`. Returns whether one existed; removing a
    /// missing entry writes nothing.
    pub async fn remove(&mut self, resource: &ResourceId) -> Result<bool, AuthError> {
        if self.find(resource).is_none() {
            return Ok(false);
        }
        let next = self
            .entries
            .iter()
            .filter(|t| &t.resource != resource)
            .cloned()
            .collect();
        self.commit(next).await?;
        Ok(true)
    }

    /// Forget every entry and delete the stored blob.
    pub async fn clear(&mut self) -> Result<(), AuthError> {
        self.store.clear(&self.identity).await?;
        self.entries.clear();
        Ok(())
    }

    // The in-memory view only changes once the store accepted the new blob.
    async fn commit(&mut self, next: Vec<CachedToken>) -> Result<(), AuthError> {
        let blob = encode_entries(&next)?;
        self.store.save(&self.identity, blob).await?;
        self.entries = next;
        Ok(())
    }
}
