//! Read-only access to the logged-in player's identity.
//!
//! Login is handled elsewhere; the game only reads the identifier it left
//! behind in `session.json` (`{"identifier": "..."}`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::app_dirs;

/// Filename of the persisted login state inside the app directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Source of the current player's identifier.
pub trait SessionIdentity: Send + Sync {
    /// Identifier of the logged-in player, or `None` when nobody is logged in.
    fn current_user(&self) -> Option<String>;
}

/// Fixed identity, or none at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSession(Option<String>);

impl StaticSession {
    pub fn logged_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl SessionIdentity for StaticSession {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Deserialize)]
struct StoredUser {
    identifier: Option<String>,
}

/// Identity read from `session.json` on every call, so logins made while the
/// game runs are picked up.
#[derive(Debug, Clone)]
pub struct StoredSession {
    path: PathBuf,
}

impl StoredSession {
    /// Session file in the application directory.
    pub fn from_app_dir() -> Result<Self, app_dirs::AppDirError> {
        Ok(Self::at_path(app_dirs::app_root_dir()?.join(SESSION_FILE_NAME)))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionIdentity for StoredSession {
    fn current_user(&self) -> Option<String> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!("Failed to read session {}: {err}", self.path.display());
                return None;
            }
        };
        match serde_json::from_slice::<StoredUser>(&bytes) {
            Ok(user) => user
                .identifier
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            Err(err) => {
                tracing::warn!("Ignoring malformed session {}: {err}", self.path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn static_session_reports_what_it_was_given() {
        assert_eq!(StaticSession::logged_in("kim").current_user().as_deref(), Some("kim"));
        assert_eq!(StaticSession::anonymous().current_user(), None);
    }

    #[test]
    fn stored_session_reads_identifier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE_NAME);
        let session = StoredSession::at_path(&path);
        assert_eq!(session.current_user(), None);

        std::fs::write(&path, r#"{"identifier":"player-7","nickname":"seven"}"#).unwrap();
        assert_eq!(session.current_user().as_deref(), Some("player-7"));

        std::fs::write(&path, r#"{"identifier":"  "}"#).unwrap();
        assert_eq!(session.current_user(), None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn from_app_dir_points_into_app_root() {
        let dir = tempdir().unwrap();
        let _guard = app_dirs::ConfigBaseGuard::set(dir.path().to_path_buf());
        let session = StoredSession::from_app_dir().unwrap();
        assert_eq!(
            session.path(),
            dir.path().join(app_dirs::APP_DIR_NAME).join(SESSION_FILE_NAME)
        );
    }
}
