pub mod cache;
pub mod discovery;
pub mod endpoint;
pub mod locks;
pub mod recovery;
pub mod redeem;
pub mod signin;
pub mod silent;
pub mod token;

pub use cache::TokenCache;
pub use discovery::{OidcMetadata, ProviderMetadata};
pub use endpoint::{Grant, GrantError, HttpTokenEndpoint, TokenEndpoint};
pub use locks::IdentityLocks;
pub use recovery::UnauthorizedRecoveryHandler;
pub use redeem::{AuthorizationCodeRedeemer, CodeRedemption};
pub use signin::{failure_location, CallbackParams, SignInRequest};
pub use silent::SilentTokenProvider;
pub use token::{CachedToken, TokenResponse};
