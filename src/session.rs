//! Client-local session storage and screen routing.
//!
//! The bearer token is the only state that survives a restart. It lives in a
//! small JSON file, `session.json`, under the user's config directory.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SessionError;

const APP_DIR: &str = "palaver";
const SESSION_FILE: &str = "session.json";

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// File-backed token storage
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    /// Store inside `dir` instead of the user config directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILE))
    }

    pub fn default_location() -> Result<Self, SessionError> {
        let dir = dirs::config_dir()
            .ok_or(SessionError::NoConfigDir)?
            .join(APP_DIR);
        Ok(Self::in_dir(&dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>, SessionError> {
        if !self.path.exists() {
            debug!("No session file at {}", self.path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        let stored: StoredSession =
            serde_json::from_str(&contents).map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if stored.token.is_empty() {
            return Ok(None);
        }
        info!("Loaded session token from {}", self.path.display());
        Ok(Some(stored.token))
    }

    pub fn save(&self, token: &str) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let body = serde_json::to_string_pretty(&StoredSession {
            token: token.to_string(),
        })
        .map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, body).map_err(io_err)?;

        info!("Session token saved to {}", self.path.display());
        Ok(())
    }

    /// Removes the stored token. A missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session token removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// The screens the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    Chat,
}

impl Screen {
    /// Where a request for `self` actually lands. Anything but the login and
    /// signup screens needs a token.
    pub fn resolve(self, has_token: bool) -> Screen {
        match self {
            Screen::Login | Screen::Signup => self,
            _ if !has_token => Screen::Login,
            other => other,
        }
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Ok(Screen::Login),
            "signup" => Ok(Screen::Signup),
            "chat" => Ok(Screen::Chat),
            other => Err(format!("unknown screen '{}' (expected login, signup or chat)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_without_token_goes_to_login() {
        assert_eq!(Screen::Chat.resolve(false), Screen::Login);
        assert_eq!(Screen::Chat.resolve(true), Screen::Chat);
    }

    #[test]
    fn test_login_and_signup_never_redirect() {
        for has_token in [true, false] {
            assert_eq!(Screen::Login.resolve(has_token), Screen::Login);
            assert_eq!(Screen::Signup.resolve(has_token), Screen::Signup);
        }
    }

    #[test]
    fn test_screen_from_str() {
        assert_eq!("Chat".parse::<Screen>(), Ok(Screen::Chat));
        assert_eq!("signup".parse::<Screen>(), Ok(Screen::Signup));
        assert!("inbox".parse::<Screen>().is_err());
    }

    #[test]
    fn test_token_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(&dir.path().join("nested"));

        assert_eq!(store.load().unwrap(), None);
        store.save("abc.def").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc.def"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path());
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(SessionError::Corrupt { .. })));
    }
}
