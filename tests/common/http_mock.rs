use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a mock federation service that serves its discovery document.
#[allow(dead_code)]
pub async fn start_mock_provider() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/adfs/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": format!("{}/adfs", server.uri()),
            "authorization_endpoint": format!("{}/adfs/oauth2/authorize/", server.uri()),
            "token_endpoint": format!("{}/adfs/oauth2/token/", server.uri()),
        })))
        .mount(&server)
        .await;

    server
}

/// Token endpoint answer for a grant whose form body contains `needle`.
#[allow(dead_code)]
pub async fn mount_token_grant(
    server: &MockServer,
    needle: &str,
    access_token: &str,
    refresh_token: &str,
    expected_calls: u64,
) {
    Mock::given(method("POST"))
        .and(path("/adfs/oauth2/token/"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "expires_in": 3600,
            "id_token": "header.payload.signature",
            "token_type": "bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Token endpoint rejection for a grant whose form body contains `needle`.
#[allow(dead_code)]
pub async fn mount_token_rejection(server: &MockServer, needle: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/adfs/oauth2/token/"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "MSIS9615: The refresh token has been revoked."
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}
