//! User directory: stored credentials looked up by username.
//!
//! The storage engine is pluggable behind [`UserDirectory`]. Two engines ship
//! with the gateway: an in-memory map seeded from configuration and a JSON
//! users file that can be swapped atomically on reload.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;

/// A user record as kept by the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub username: String,
    pub password: String,
}

impl StoredUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Failure of the storage engine. "No such user" is not an error.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read users file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup contract used by the authenticator.
///
/// Implementations must be safe for concurrent reads from many in-flight
/// requests and must not have side effects.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, DirectoryError>;
}

/// Directory held in a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, String>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(users: HashMap<String, String>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn insert(&self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }

    pub fn remove(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, DirectoryError> {
        Ok(self
            .users
            .get(username)
            .map(|entry| StoredUser::new(entry.key().clone(), entry.value().clone())))
    }
}

/// Directory backed by a JSON file of the form `{"username": "password"}`.
///
/// Readers see either the old or the new map during a reload, never a mix.
#[derive(Debug)]
pub struct FileUserDirectory {
    path: PathBuf,
    users: ArcSwap<HashMap<String, String>>,
}

impl FileUserDirectory {
    /// Load the file; fails if it cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref().to_path_buf();
        let users = read_users_file(&path)?;
        tracing::info!(path = %path.display(), users = users.len(), "Loaded users file");
        Ok(Self {
            path,
            users: ArcSwap::from_pointee(users),
        })
    }

    /// Re-read the file. On failure the current map is kept.
    pub fn reload(&self) -> Result<usize, DirectoryError> {
        let users = read_users_file(&self.path)?;
        let count = users.len();
        self.users.store(Arc::new(users));
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.users.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.load().is_empty()
    }
}

fn read_users_file(path: &Path) -> Result<HashMap<String, String>, DirectoryError> {
    let content = fs::read_to_string(path).map_err(|source| DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

#[async_trait]
impl UserDirectory for FileUserDirectory {
    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, DirectoryError> {
        Ok(self
            .users
            .load()
            .get(username)
            .map(|password| StoredUser::new(username, password.clone())))
    }
}
