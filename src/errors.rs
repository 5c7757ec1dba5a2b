//! Gateway error taxonomy and its mapping onto HTTP responses.
//!
//! Only authentication failures become `401`. Pool, directory and backend
//! failures surface as 5xx so callers can tell "you are not allowed" apart
//! from "the system is unhealthy".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::auth::directory::DirectoryError;
use crate::fetch::FetchError;
use crate::pool::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Unknown user, wrong password, or no credentials at all.
    #[error("Unauthorized")]
    Unauthorized,

    /// No backend connection could be checked out.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The backend could not be reached or answered with a failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The credential store itself failed (not the same as "user not found").
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl GatewayError {
    /// Status code for this error. `upstream_failure` is the configured status
    /// for backend failures other than timeouts.
    pub fn status_code(&self, upstream_failure: StatusCode) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Fetch(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Fetch(_) => upstream_failure,
            GatewayError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns a user-safe message that never includes credentials or
    /// upstream detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "Unauthorized",
            GatewayError::Pool(_) | GatewayError::Directory(_) => "Service unavailable",
            GatewayError::Fetch(FetchError::Timeout { .. }) => "Upstream request timed out",
            GatewayError::Fetch(_) => "Upstream request failed",
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::Pool(PoolError::Exhausted { .. }) => "pool_exhausted",
            GatewayError::Pool(PoolError::Closed) => "pool_closed",
            GatewayError::Fetch(FetchError::Timeout { .. }) => "upstream_timeout",
            GatewayError::Fetch(_) => "upstream_error",
            GatewayError::Directory(_) => "directory_error",
        }
    }

    /// Build the response, logging at a level matching severity.
    pub fn into_response_with(self, upstream_failure: StatusCode) -> Response {
        match &self {
            GatewayError::Unauthorized => tracing::info!("Authentication failed"),
            GatewayError::Pool(e) => tracing::warn!(error = %e, "Connection pool unavailable"),
            GatewayError::Fetch(e) => tracing::warn!(error = %e, "Upstream fetch failed"),
            GatewayError::Directory(e) => tracing::error!(error = %e, "User directory failure"),
        }

        let status = self.status_code(upstream_failure);
        (status, self.user_message()).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::BAD_GATEWAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_auth_failures_are_401() {
        let upstream = StatusCode::BAD_GATEWAY;
        let errors = vec![
            GatewayError::Pool(PoolError::Exhausted {
                waited: Duration::from_millis(10),
            }),
            GatewayError::Pool(PoolError::Closed),
            GatewayError::Fetch(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            GatewayError::Fetch(FetchError::Timeout {
                after: Duration::from_secs(1),
            }),
            GatewayError::Fetch(FetchError::Transport("connection reset".into())),
            GatewayError::Directory(DirectoryError::Unavailable("disk".into())),
        ];
        for err in errors {
            let status = err.status_code(upstream);
            assert_ne!(status, StatusCode::UNAUTHORIZED, "{err:?}");
            assert!(status.is_server_error(), "{err:?}");
        }
        assert_eq!(GatewayError::Unauthorized.status_code(upstream), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_status_is_configurable() {
        let err = GatewayError::Fetch(FetchError::Status(StatusCode::NOT_FOUND));
        assert_eq!(
            err.status_code(StatusCode::SERVICE_UNAVAILABLE),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn messages_hide_internal_detail() {
        let err =
            GatewayError::Fetch(FetchError::Transport("tcp connect 10.0.0.3:9000 refused".into()));
        assert_eq!(err.user_message(), "Upstream request failed");
    }
}
