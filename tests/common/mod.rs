pub mod http_mock;

use std::path::Path;

use fedauth::FederationConfig;

/// Configuration pointing every endpoint at `base_uri`.
#[allow(dead_code)]
pub fn config_for(base_uri: &str) -> FederationConfig {
    serde_json::from_value(serde_json::json!({
        "clientId": "todolist-webapp",
        "clientSecret": "webapp-secret",
        "discoveryDoc": format!("{base_uri}/adfs/.well-known/openid-configuration"),
        "resourceId": "api",
        "baseAddress": base_uri,
        "publicOrigin": "https://webapp.local",
        "requestTimeoutMs": 2000
    }))
    .unwrap()
}

/// Write a fedauth.json for `base_uri` into `dir` and return its path.
#[allow(dead_code)]
pub fn write_config(dir: &Path, base_uri: &str) -> std::path::PathBuf {
    let path = dir.join("fedauth.json");
    let json = serde_json::json!({
        "clientId": "todolist-webapp",
        "clientSecret": "${FEDAUTH_TEST_CLIENT_SECRET:-webapp-secret}",
        "discoveryDoc": format!("{base_uri}/adfs/.well-known/openid-configuration"),
        "resourceId": "api",
        "baseAddress": base_uri,
        "requestTimeoutMs": 2000
    });
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    path
}
