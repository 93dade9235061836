mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fedauth::oauth::{CachedToken, TokenCache};
use fedauth::{
    ApiOutcome, AuthError, FederationClient, Identity, MemorySession, ProtectedApi, ResourceId,
    SessionStorage, SessionTokenStore,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn session() -> Arc<MemorySession> {
    Arc::new(MemorySession::new())
}

async fn seed_expired(session: &Arc<MemorySession>, identity: &str, access: &str) {
    let mut cache = TokenCache::hydrate(
        Identity::new(identity),
        SessionTokenStore::new(session.clone()),
    )
    .await
    .unwrap();
    cache
        .put(CachedToken {
            resource: ResourceId::new("api"),
            access_token: access.into(),
            refresh_token: Some("rt-old".into()),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(10)),
            id_token: None,
            token_type: "Bearer".into(),
        })
        .await
        .unwrap();
}

async fn cached_entries(session: &Arc<MemorySession>, identity: &str) -> Vec<CachedToken> {
    TokenCache::hydrate(
        Identity::new(identity),
        SessionTokenStore::new(session.clone()),
    )
    .await
    .unwrap()
    .entries()
    .to_vec()
}

/// Fresh session with nothing cached
#[tokio::test]
async fn fresh_session_requires_interaction() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "grant_type=refresh_token", "x", "y", 0).await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));

    let err = client
        .acquire_token(session(), &Identity::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { ref resource } if resource == "api"));
}

/// Redeem "abc", then acquire silently from cache without another provider call
#[tokio::test]
async fn redemption_then_cache_hit() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "code=abc", "at-abc", "rt-abc", 1).await;
    common::http_mock::mount_token_grant(&server, "grant_type=refresh_token", "x", "y", 0).await;

    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    let u1 = Identity::new("u1");
    let t = Utc::now();

    let redemption = client.redeem_code(session.clone(), &u1, "abc").await.unwrap();
    assert!(redemption.code_redeemed);

    let entries = cached_entries(&session, "u1").await;
    assert_eq!(entries.len(), 1);
    let expires = entries[0].expires_at.unwrap();
    assert!(expires >= t + chrono::Duration::seconds(3600));
    assert!(expires <= Utc::now() + chrono::Duration::seconds(3600));

    let token = client.acquire_token(session.clone(), &u1).await.unwrap();
    assert_eq!(token.secret(), "at-abc");
    let again = client.acquire_token(session, &u1).await.unwrap();
    assert_eq!(again, token);
}

/// The in-memory cache is rebuildable from the session alone
#[tokio::test]
async fn new_client_reads_tokens_from_session() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "code=abc", "at-abc", "rt-abc", 1).await;
    let session = session();
    let u1 = Identity::new("u1");

    FederationClient::from_config(common::config_for(&server.uri()))
        .redeem_code(session.clone(), &u1, "abc")
        .await
        .unwrap();

    let other = FederationClient::from_config(common::config_for(&server.uri()));
    let token = other.acquire_token(session, &u1).await.unwrap();
    assert_eq!(token.secret(), "at-abc");
}

/// A rejected code is a redemption error and leaves the session untouched
#[tokio::test]
async fn rejected_code_is_redemption_error() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_rejection(&server, "code=used", 1).await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();

    let err = client
        .redeem_code(session.clone(), &Identity::new("u1"), "used")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Redemption { .. }));
    assert!(err.to_string().contains("MSIS9615"));
    assert_eq!(session.write_count(), 0);
}

/// Expired token: one refresh, new token replaces the old one
#[tokio::test]
async fn expired_token_is_refreshed_once() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "refresh_token=rt-old", "at-new", "rt-new", 1)
        .await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    seed_expired(&session, "u1", "at-expired").await;
    let u1 = Identity::new("u1");

    let token = client.acquire_token(session.clone(), &u1).await.unwrap();
    assert_eq!(token.secret(), "at-new");
    assert_ne!(token.secret(), "at-expired");

    let entries = cached_entries(&session, "u1").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].access_token, "at-new");
    assert_eq!(entries[0].refresh_token.as_deref(), Some("rt-new"));
    assert!(entries[0].expires_at.unwrap() > Utc::now() + chrono::Duration::minutes(59));

    client.acquire_token(session, &u1).await.unwrap();
}

/// Revoked refresh token: entry removed, later calls need interaction
#[tokio::test]
async fn revoked_refresh_token_clears_entry() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_rejection(&server, "grant_type=refresh_token", 1).await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    seed_expired(&session, "u1", "at-expired").await;
    let u1 = Identity::new("u1");

    let err = client.acquire_token(session.clone(), &u1).await.unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { .. }));
    assert!(cached_entries(&session, "u1").await.is_empty());

    let err = client.acquire_token(session, &u1).await.unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { .. }));
}

/// Downstream 401 purges the token; the next acquisition needs interaction
#[tokio::test]
async fn downstream_unauthorized_forces_sign_in() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "code=abc", "at-abc", "rt-abc", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/todolist"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = Arc::new(FederationClient::from_config(common::config_for(
        &server.uri(),
    )));
    let session = session();
    let u1 = Identity::new("u1");
    client.redeem_code(session.clone(), &u1, "abc").await.unwrap();

    let api = ProtectedApi::new(client.clone()).unwrap();
    let outcome = api
        .get_json(session.clone(), &u1, "/api/todolist")
        .await
        .unwrap();
    assert!(matches!(outcome, ApiOutcome::Unauthorized));

    let err = client.acquire_token(session, &u1).await.unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { .. }));
}

/// Recovery with nothing cached is a no-op, twice in a row
#[tokio::test]
async fn on_unauthorized_is_idempotent() {
    let server = common::http_mock::start_mock_provider().await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    let u1 = Identity::new("u1");

    assert!(!client.on_unauthorized(session.clone(), &u1).await.unwrap());
    assert!(!client.on_unauthorized(session.clone(), &u1).await.unwrap());
    assert_eq!(session.write_count(), 0);
}

/// A corrupted session blob behaves like an empty cache
#[tokio::test]
async fn corrupted_blob_requires_interaction() {
    let server = common::http_mock::start_mock_provider().await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    let u1 = Identity::new("u1");
    session
        .set(&SessionTokenStore::session_key(&u1), b"\x00garbage".to_vec())
        .await
        .unwrap();

    let err = client.acquire_token(session, &u1).await.unwrap_err();
    assert!(err.requires_sign_in());
}

/// Tokens of one user are invisible to another in the same session
#[tokio::test]
async fn identities_do_not_share_tokens() {
    let server = common::http_mock::start_mock_provider().await;
    common::http_mock::mount_token_grant(&server, "code=abc", "at-abc", "rt-abc", 1).await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();

    client
        .redeem_code(session.clone(), &Identity::new("u1"), "abc")
        .await
        .unwrap();
    let err = client
        .acquire_token(session, &Identity::new("u2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { .. }));
}

/// A request dropped while the code is being exchanged still caches the tokens
#[tokio::test]
async fn dropped_sign_in_request_keeps_redeemed_tokens() {
    let server = common::http_mock::start_mock_provider().await;
    Mock::given(method("POST"))
        .and(path("/adfs/oauth2/token/"))
        .and(body_string_contains("code=slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "at-slow",
                    "refresh_token": "rt-slow",
                    "expires_in": 3600
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = FederationClient::from_config(common::config_for(&server.uri()));
    let session = session();
    let u1 = Identity::new("u1");

    let aborted = tokio::time::timeout(
        Duration::from_millis(100),
        client.redeem_code(session.clone(), &u1, "slow"),
    )
    .await;
    assert!(aborted.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    let token = client.acquire_token(session, &u1).await.unwrap();
    assert_eq!(token.secret(), "at-slow");
}
