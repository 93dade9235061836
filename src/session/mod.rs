pub mod file;
pub mod memory;
pub mod store;

use async_trait::async_trait;

use crate::error::AuthError;

pub use file::FileSession;
pub use memory::MemorySession;
pub use store::{SessionBlob, SessionTokenStore};

/// Key-value storage scoped to one browser session, as provided by the host.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AuthError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), AuthError>;
}
