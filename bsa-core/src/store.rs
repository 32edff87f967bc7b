//! Persistent session storage
//!
//! One serialized [`Session`] per installation, stored under
//! [`crate::STORAGE_KEY`]. The session manager owns writes; the API client
//! and the renewal interceptor read it to find the current tokens.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Session;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Session store lock poisoned")]
    Poisoned,
}

/// Durable storage for the single session record
pub trait SessionStore: Send + Sync {
    /// Load the stored session, if any
    fn load(&self) -> Result<Option<Session>, StoreError>;

    /// Replace the stored session
    fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Erase the stored session entirely
    fn clear(&self) -> Result<(), StoreError>;

    /// Current access token, empty when logged out
    fn access_token(&self) -> Option<String> {
        match self.load() {
            Ok(session) => session
                .map(|s| s.access_token)
                .filter(|token| !token.is_empty()),
            Err(e) => {
                warn!("Failed to read session: {}", e);
                None
            }
        }
    }
}

/// JSON file backed session store
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Unreadable blob: drop it so the user starts from a clean login
                warn!(path = %self.path.display(), "Discarding corrupt session: {}", e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(session)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, StoreError> {
        let guard = self.session.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut guard = self.session.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.session.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = None;
        Ok(())
    }
}
