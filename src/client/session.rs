//! Session cookie persistence
//!
//! The backend tracks the signed-in user with a cookie. Between CLI runs the
//! cookie header is kept in a single file in the data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored cookie header, or `None` when signed out
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let cookie = content.trim();
                (!cookie.is_empty()).then(|| cookie.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to read session file");
                None
            }
        }
    }

    pub fn save(&self, cookie: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, cookie)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
