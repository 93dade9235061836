pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod types;

pub use api::{ApiOutcome, ProtectedApi};
pub use client::FederationClient;
pub use config::{load_config, FederationConfig};
pub use error::AuthError;
pub use oauth::{
    AuthorizationCodeRedeemer, CodeRedemption, SilentTokenProvider, UnauthorizedRecoveryHandler,
};
pub use session::{FileSession, MemorySession, SessionStorage, SessionTokenStore};
pub use types::{AccessToken, ClientCredential, Identity, ResourceId};
