//! Theme preference
//!
//! Two states, `light` (initial) and `dark`. The stored value is read once
//! when the store is opened and written only by [`ThemeStore::toggle`].

use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Anything other than `dark` is treated as light
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Bootstrap icon shown on the toggle button
    pub fn icon_class(&self) -> &'static str {
        match self {
            Theme::Light => "bi-sun-fill",
            Theme::Dark => "bi-moon-fill",
        }
    }
}

/// File-backed theme preference
pub struct ThemeStore {
    path: PathBuf,
    current: Theme,
}

impl ThemeStore {
    /// Read the stored preference once; a missing or unreadable file means light
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match std::fs::read_to_string(&path) {
            Ok(content) => Theme::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Theme::default(),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read theme preference");
                Theme::default()
            }
        };
        Self { path, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Flip the theme and persist it
    pub fn toggle(&mut self) -> std::io::Result<Theme> {
        let next = self.current.toggled();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, next.as_str())?;
        self.current = next;
        tracing::debug!(theme = next.as_str(), "Theme toggled");
        Ok(next)
    }
}
