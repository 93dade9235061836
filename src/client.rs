use std::sync::Arc;

use crate::config::FederationConfig;
use crate::error::AuthError;
use crate::oauth::signin::build_sign_in_request;
use crate::oauth::{
    AuthorizationCodeRedeemer, CallbackParams, CodeRedemption, HttpTokenEndpoint, IdentityLocks,
    ProviderMetadata, SignInRequest, SilentTokenProvider, TokenCache, TokenEndpoint,
    UnauthorizedRecoveryHandler,
};
use crate::session::{SessionStorage, SessionTokenStore};
use crate::types::{AccessToken, Identity};

/// Process-wide entry point: configuration, provider metadata, token endpoint
/// and identity locks. Per-request work takes the caller's session storage.
pub struct FederationClient {
    config: FederationConfig,
    metadata: Arc<ProviderMetadata>,
    endpoint: Arc<dyn TokenEndpoint>,
    locks: IdentityLocks,
}

impl FederationClient {
    /// Create a client that talks to the provider named in `config`. Metadata
    /// is fetched on first use.
    pub fn from_config(config: FederationConfig) -> Self {
        let metadata = Arc::new(ProviderMetadata::new(
            config.discovery_doc.clone(),
            config.request_timeout(),
        ));
        let endpoint = Arc::new(HttpTokenEndpoint::new(
            metadata.clone(),
            config.request_timeout(),
        ));
        Self::with_endpoint(config, metadata, endpoint)
    }

    pub fn with_endpoint(
        config: FederationConfig,
        metadata: Arc<ProviderMetadata>,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Self {
        Self {
            config,
            metadata,
            endpoint,
            locks: IdentityLocks::new(),
        }
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    fn store(&self, session: Arc<dyn SessionStorage>) -> SessionTokenStore {
        SessionTokenStore::new(session)
    }

    pub fn redeemer(&self, session: Arc<dyn SessionStorage>) -> AuthorizationCodeRedeemer {
        AuthorizationCodeRedeemer::new(
            self.endpoint.clone(),
            self.store(session),
            self.locks.clone(),
        )
    }

    pub fn silent_provider(&self, session: Arc<dyn SessionStorage>) -> SilentTokenProvider {
        SilentTokenProvider::new(self.endpoint.clone(), self.store(session), self.locks.clone())
            .with_clock_skew(self.config.clock_skew())
    }

    pub fn recovery_handler(&self, session: Arc<dyn SessionStorage>) -> UnauthorizedRecoveryHandler {
        UnauthorizedRecoveryHandler::new(self.store(session), self.locks.clone())
    }

    /// Authorization request for interactive sign-in.
    pub async fn sign_in_request(&self) -> Result<SignInRequest, AuthError> {
        let metadata = self.metadata.get().await?;
        build_sign_in_request(
            &metadata.authorization_endpoint,
            &self.config.client_id,
            &self.config.redirect_uri(),
            &self.config.resource(),
        )
    }

    /// Redeem a code for the configured downstream resource.
    pub async fn redeem_code(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        code: &str,
    ) -> Result<CodeRedemption, AuthError> {
        self.redeem_code_at(session, identity, code, &self.config.redirect_uri())
            .await
    }

    /// Redeem a code that was issued for `redirect_uri`. The provider only
    /// accepts the redirect URI the authorization request carried.
    pub async fn redeem_code_at(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeRedemption, AuthError> {
        self.redeemer(session)
            .redeem(
                identity,
                code,
                redirect_uri,
                &self.config.credential(),
                &self.config.resource(),
            )
            .await
    }

    /// Handle the provider's callback: validate, then redeem the code before
    /// anything else in the request proceeds.
    ///
    /// Validating the callback's id token (signature, audience, the `nonce`
    /// from [`SignInRequest`]) and deriving `identity` from its name
    /// identifier claim is left to the host's sign-in middleware. The id token
    /// is handed back in [`CodeRedemption::id_token`] when the token response
    /// does not carry its own.
    pub async fn complete_sign_in(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<CodeRedemption, AuthError> {
        let code = params.authorization_code(expected_state)?;
        let mut redemption = self.redeem_code(session, identity, code).await?;
        if redemption.id_token.is_none() {
            redemption.id_token = params.id_token.clone();
        }
        Ok(redemption)
    }

    /// Silent acquisition for the configured downstream resource.
    pub async fn acquire_token(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
    ) -> Result<AccessToken, AuthError> {
        self.silent_provider(session)
            .acquire_silent(identity, &self.config.resource(), &self.config.credential())
            .await
    }

    /// Call after the downstream API rejected a token from `acquire_token`.
    pub async fn on_unauthorized(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
    ) -> Result<bool, AuthError> {
        self.recovery_handler(session)
            .on_unauthorized(identity, &self.config.resource())
            .await
    }

    /// Forget every cached token of `identity` in this session.
    pub async fn sign_out(
        &self,
        session: Arc<dyn SessionStorage>,
        identity: &Identity,
    ) -> Result<(), AuthError> {
        let _guard = self.locks.lock(identity).await;
        let mut cache = TokenCache::hydrate(identity.clone(), self.store(session)).await?;
        cache.clear().await?;
        tracing::info!("Cleared cached tokens for {identity}");
        Ok(())
    }
}
