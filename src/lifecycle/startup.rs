//! Startup orchestration.
//!
//! # Responsibilities
//! - Pick the user directory (users file when configured, inline map otherwise)
//! - Build the backend pool and fetcher from configuration
//! - Assemble the `Gateway`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing touches the network here; backend connections open lazily

use std::sync::Arc;

use axum::http::StatusCode;

use crate::auth::{
    DirectoryError, FileUserDirectory, InMemoryUserDirectory, SessionPolicy, UserDirectory,
};
use crate::config::GatewayConfig;
use crate::fetch::HttpFetcher;
use crate::gateway::Gateway;
use crate::pool::BackendPool;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid backend address: {0}")]
    BackendUrl(#[from] url::ParseError),
    #[error("failed to load users: {0}")]
    Directory(#[from] DirectoryError),
    #[error("invalid upstream failure status: {0}")]
    UpstreamStatus(u16),
}

/// Assemble the gateway from configuration.
///
/// Also returns the file-backed directory, if any, so the server can watch it.
pub fn build_gateway(
    config: &GatewayConfig,
) -> Result<(Gateway, Option<Arc<FileUserDirectory>>), StartupError> {
    let (directory, users_file): (Arc<dyn UserDirectory>, _) = match &config.users.file {
        Some(path) => {
            let file = Arc::new(FileUserDirectory::load(path)?);
            tracing::info!(path = %path, users = file.len(), "Loaded users file");
            if !config.users.inline.is_empty() {
                tracing::warn!("Both users.file and users.inline are set, ignoring users.inline");
            }
            let directory: Arc<dyn UserDirectory> = file.clone();
            (directory, Some(file))
        }
        None => {
            let inline = InMemoryUserDirectory::from_map(config.users.inline.clone());
            if inline.is_empty() {
                tracing::warn!("No users configured, only session cookies will be accepted");
            }
            let directory: Arc<dyn UserDirectory> = Arc::new(inline);
            (directory, None)
        }
    };

    let pool = Arc::new(BackendPool::from_config(&config.pool, &config.backend)?);
    let fetcher = Arc::new(HttpFetcher::from_config(&config.backend));
    let upstream_failure = StatusCode::from_u16(config.gateway.upstream_failure_status)
        .map_err(|_| StartupError::UpstreamStatus(config.gateway.upstream_failure_status))?;

    let gateway = Gateway::new(directory, pool, fetcher, SessionPolicy::from(&config.session))
        .with_upstream_failure_status(upstream_failure);

    Ok((gateway, users_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_assemble() {
        let (gateway, users_file) = build_gateway(&GatewayConfig::default()).unwrap();
        assert!(users_file.is_none());
        assert_eq!(gateway.upstream_failure_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(gateway.pool().size(), 10);
    }

    #[test]
    fn users_file_is_preferred() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"foo": "bar"}}"#).unwrap();

        let mut config = GatewayConfig::default();
        config.users.file = Some(file.path().to_string_lossy().into_owned());
        config.users.inline.insert("other".into(), "pw".into());

        let (_, users_file) = build_gateway(&config).unwrap();
        assert_eq!(users_file.unwrap().len(), 1);
    }

    #[test]
    fn missing_users_file_is_fatal() {
        let mut config = GatewayConfig::default();
        config.users.file = Some("/nonexistent/users.json".into());
        assert!(matches!(build_gateway(&config), Err(StartupError::Directory(_))));
    }

    #[test]
    fn bad_backend_address_is_fatal() {
        let mut config = GatewayConfig::default();
        config.backend.address = "not a url".into();
        assert!(matches!(build_gateway(&config), Err(StartupError::BackendUrl(_))));
    }
}
