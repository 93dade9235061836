use std::path::{Path, PathBuf};

use crate::error::AuthError;

use super::env::expand_federation_config;
use super::types::FederationConfig;

/// Strip JSONC comments (// line comments and /* */ block comments) from input.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(ch) = chars.next() {
        if escape_next {
            escape_next = false;
            result.push(ch);
            continue;
        }

        if in_string {
            result.push(ch);
            if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            result.push(ch);
            continue;
        }

        if ch != '/' {
            result.push(ch);
            continue;
        }

        match chars.peek() {
            Some(&'/') => {
                chars.next();
                for c in chars.by_ref() {
                    if c == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // Keep line numbers stable for serde error positions
                    if c == '\n' {
                        result.push('\n');
                    }
                    prev = c;
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Find the config file to use, highest precedence first.
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `FEDAUTH_CONFIG` env var
/// 3. `./config/fedauth.json` (project-level)
/// 4. `~/.fedauth/fedauth.json` or `~/.fedauth/fedauth.jsonc` (home-level)
pub fn discover_config_file(cli_config: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = cli_config {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(env_path) = std::env::var("FEDAUTH_CONFIG") {
        let p = PathBuf::from(&env_path);
        if p.exists() {
            return Some(p);
        }
    }

    let project_config = PathBuf::from("./config/fedauth.json");
    if project_config.exists() {
        return Some(project_config);
    }

    let home = dirs::home_dir()?.join(".fedauth");
    [home.join("fedauth.json"), home.join("fedauth.jsonc")]
        .into_iter()
        .find(|p| p.exists())
}

/// Load a single config file, stripping JSONC comments before parsing.
pub fn load_config_file(path: &Path) -> Result<FederationConfig, AuthError> {
    let content = std::fs::read_to_string(path).map_err(|e| AuthError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;

    let stripped = strip_jsonc_comments(&content);
    let mut config: FederationConfig =
        serde_json::from_str(&stripped).map_err(|e| AuthError::ConfigError {
            path: path.to_path_buf(),
            detail: format!("Invalid JSON: {e}"),
        })?;

    expand_federation_config(&mut config)?;
    config.validate().map_err(|detail| AuthError::ConfigError {
        path: path.to_path_buf(),
        detail,
    })?;
    Ok(config)
}

/// Discover, read, expand and validate the federation configuration.
pub fn load_config(cli_config: Option<&str>) -> Result<FederationConfig, AuthError> {
    let path = discover_config_file(cli_config).ok_or_else(|| AuthError::ConfigError {
        path: PathBuf::from(cli_config.unwrap_or("./config/fedauth.json")),
        detail: "No configuration file found (pass --config or set FEDAUTH_CONFIG)".into(),
    })?;
    tracing::debug!("Loading configuration from {}", path.display());
    load_config_file(&path)
}
