//! Credential token storage.
//!
//! The session keeps one opaque token under the fixed key [`TOKEN_KEY`].
//! Absence of a token means there is no cached session. The store is
//! shared with consumers outside the session (for example an HTTP API
//! client that attaches the same bearer token), so implementations use
//! interior mutability.
//!
//! | Store | Backing |
//! |-------|---------|
//! | [`MemoryCredentialStore`] | Process memory |
//! | [`FileCredentialStore`] | `<dir>/token.json` |

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Name the token is stored under.
pub const TOKEN_KEY: &str = "token";

// ============================================================================
// CredentialStore
// ============================================================================

/// Persistent home of the credential token.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored token, if any.
    fn load(&self) -> Option<String>;

    /// Stores `token`, or removes it when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] or [`Error::Io`] if the write fails.
    fn store(&self, token: Option<&str>) -> Result<()>;
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `token`.
    #[inline]
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn store(&self, token: Option<&str>) -> Result<()> {
        *self.token.lock() = token.map(str::to_owned);
        Ok(())
    }
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// File-backed store writing `<dir>/token.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store inside `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{TOKEN_KEY}.json")),
        }
    }

    /// Creates a store in the platform config directory under `app_name`.
    ///
    /// - Linux: `~/.config/<app_name>/`
    /// - macOS: `~/Library/Application Support/<app_name>/`
    /// - Windows: `%APPDATA%\<app_name>\`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the platform has no config directory.
    pub fn in_config_dir(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::storage("no platform config directory"))?;
        Ok(Self::new(config_dir.join(app_name)))
    }

    /// Returns the token file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        let json = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<String>(&json) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }

    fn store(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => {
                if let Some(dir) = self.path.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(&self.path, serde_json::to_string(token)?)?;
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
