use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::AuthError;

use super::SessionStorage;

/// Session storage backed by a directory, one file per key.
///
/// Used by the command-line front end, where there is no web framework
/// session to lean on.
#[derive(Debug, Clone)]
pub struct FileSession {
    dir: PathBuf,
}

impl FileSession {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.fedauth/sessions/<session_id>`
    pub fn for_session(session_id: &str) -> Self {
        let base = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fedauth")
            .join("sessions");
        Self::new(base.join(file_name(session_id)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

/// Map an arbitrary key onto a safe file name.
fn file_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    if out.starts_with('.') {
        out.replace_range(0..1, "%2E");
    }
    out
}

fn session_error(action: &str, path: &Path, e: std::io::Error) -> AuthError {
    AuthError::Session(format!("Cannot {action} {}: {e}", path.display()))
}

#[async_trait]
impl SessionStorage for FileSession {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(session_error("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AuthError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| session_error("create", &self.dir, e))?;
        let path = self.path_for(key);
        // Write-then-rename so a reader never sees a half-written blob
        let tmp = self.dir.join(format!("{}.tmp", file_name(key)));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| session_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| session_error("replace", &path, e))
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(session_error("remove", &path, e)),
        }
    }
}
