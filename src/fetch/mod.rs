//! Backend fetch subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated request + PooledConnection
//!     → http.rs (build target URL, single GET, bounded by fetch timeout)
//!     → FetchResult (buffered body + status/headers envelope)
//!     → or FetchError (timeout / transport / status / body)
//! ```
//!
//! # Design Decisions
//! - The fetcher never authenticates and never manages connection lifetime
//! - Transport failures mark the connection broken so the pool drops it
//! - Non-2xx backend answers are failures, not content

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::pool::BackendConnection;

pub use self::http::HttpFetcher;

/// What to fetch from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Request path, still percent-encoded.
    pub path: String,
    /// Query parameters safe to forward.
    pub query: Vec<(String, String)>,
    pub request_id: String,
}

impl FetchRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            request_id: "unknown".to_string(),
        }
    }
}

/// Buffered backend response.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl FetchResult {
    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Backend failures. None of these is an authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream did not answer within {after:?}")]
    Timeout { after: Duration },
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("upstream returned {0}")]
    Status(StatusCode),
    #[error("failed to read upstream body: {0}")]
    Body(String),
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

/// Retrieves content over an acquired connection.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        conn: &BackendConnection,
        request: &FetchRequest,
    ) -> Result<FetchResult, FetchError>;
}
