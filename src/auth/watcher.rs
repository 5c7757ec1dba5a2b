//! Users file watcher for hot reload.

use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::auth::directory::FileUserDirectory;

/// Reloads a [`FileUserDirectory`] whenever its file changes on disk.
pub struct UsersFileWatcher {
    directory: Arc<FileUserDirectory>,
}

impl UsersFileWatcher {
    pub fn new(directory: Arc<FileUserDirectory>) -> Self {
        Self { directory }
    }

    /// Start watching in notify's background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = self.directory.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match directory.reload() {
                            Ok(count) => {
                                tracing::info!(users = count, "Users file reloaded");
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    "Failed to reload users file, keeping current users"
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.directory.path(), RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.directory.path().display(), "Users file watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::UserDirectory;

    #[tokio::test]
    async fn picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"foo": "bar"}"#).unwrap();

        let directory = Arc::new(FileUserDirectory::load(&path).unwrap());
        let _watcher = UsersFileWatcher::new(directory.clone()).run().unwrap();

        std::fs::write(&path, r#"{"foo": "bar", "alice": "secret"}"#).unwrap();

        let mut found = false;
        for _ in 0..50 {
            if directory.get_user("alice").await.unwrap().is_some() {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(found, "watcher should reload the users file");
    }
}
