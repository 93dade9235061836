use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Sign-in failed: authorization code could not be redeemed: {detail}")]
    Redemption { detail: String },

    #[error("Interactive sign-in required to obtain a token for '{resource}'")]
    InteractionRequired { resource: String },

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Provider metadata error: {0}")]
    Discovery(String),

    #[error("API call failed: {0}")]
    Api(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AuthError {
    pub fn interaction_required(resource: &str) -> Self {
        AuthError::InteractionRequired {
            resource: resource.to_string(),
        }
    }

    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Redemption { .. } => "redemption_failed",
            AuthError::InteractionRequired { .. } => "interaction_required",
            AuthError::Session(_) => "session_error",
            AuthError::Discovery(_) => "discovery_error",
            AuthError::Api(_) => "api_error",
            AuthError::ConfigError { .. } => "config_error",
            AuthError::IoError(_) => "io_error",
        }
    }

    /// Whether the right response to this error is sending the user back
    /// through interactive sign-in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            AuthError::Redemption { .. } | AuthError::InteractionRequired { .. }
        )
    }

    pub fn resource(&self) -> Option<&str> {
        match self {
            AuthError::InteractionRequired { resource } => Some(resource),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(resource) = self.resource() {
            obj.insert(
                "resource".into(),
                serde_json::Value::String(resource.to_string()),
            );
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        obj.insert(
            "signInRequired".into(),
            serde_json::Value::Bool(self.requires_sign_in()),
        );
        serde_json::json!({ "error": obj })
    }
}
