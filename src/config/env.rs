use crate::error::AuthError;

use super::types::FederationConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
pub fn expand_env_vars(input: &str) -> Result<String, AuthError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }

        chars.next(); // consume '{'
        let mut var_expr = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
            if c == '}' {
                found_close = true;
                break;
            }
            var_expr.push(c);
        }
        if !found_close {
            return Err(env_error(&format!(
                "Unclosed variable reference: ${{{var_expr}"
            )));
        }

        if let Some((var_name, fallback)) = var_expr.split_once(":-") {
            match std::env::var(var_name) {
                Ok(val) if !val.is_empty() => result.push_str(&val),
                _ => result.push_str(fallback),
            }
        } else {
            match std::env::var(&var_expr) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    return Err(env_error(&format!(
                        "Environment variable '{var_expr}' is not set"
                    )));
                }
            }
        }
    }

    Ok(result)
}

/// Expand environment variables in every string field of a FederationConfig.
pub fn expand_federation_config(config: &mut FederationConfig) -> Result<(), AuthError> {
    config.client_id = expand_env_vars(&config.client_id)?;
    config.client_secret = expand_env_vars(&config.client_secret)?;
    config.callback_path = expand_env_vars(&config.callback_path)?;
    config.discovery_doc = expand_env_vars(&config.discovery_doc)?;
    config.resource_id = expand_env_vars(&config.resource_id)?;
    config.base_address = expand_env_vars(&config.base_address)?;
    if let Some(ref mut origin) = config.public_origin {
        *origin = expand_env_vars(origin)?;
    }
    Ok(())
}

fn env_error(detail: &str) -> AuthError {
    AuthError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail: detail.to_string(),
    }
}
