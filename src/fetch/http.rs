//! HTTP fetcher over a pooled backend connection.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use hyper::body::Incoming;
use url::Url;

use crate::config::BackendConfig;
use crate::fetch::{FetchError, FetchRequest, FetchResult, Fetcher};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::pool::BackendConnection;

/// Single-shot `GET` against the connection's backend.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            timeout,
            max_body_bytes,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.fetch_timeout(), config.max_body_bytes)
    }

    async fn fetch_inner(
        &self,
        conn: &BackendConnection,
        request: &FetchRequest,
    ) -> Result<FetchResult, FetchError> {
        let target = build_target(conn.base_url(), &request.path, &request.query);
        let uri: Uri = target
            .as_str()
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| FetchError::InvalidTarget(e.to_string()))?;

        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(X_REQUEST_ID, request.request_id.as_str())
            .body(Body::empty())
            .map_err(|e| FetchError::InvalidTarget(e.to_string()))?;

        let response = conn.client().request(req).await.map_err(|e| {
            conn.mark_broken();
            FetchError::Transport(e.to_string())
        })?;

        let (parts, body): (_, Incoming) = response.into_parts();
        if !parts.status.is_success() {
            return Err(FetchError::Status(parts.status));
        }

        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(FetchResult {
            body,
            content_type,
            status: parts.status,
            headers: parts.headers,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        conn: &BackendConnection,
        request: &FetchRequest,
    ) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        let fetch = tokio::time::timeout(self.timeout, self.fetch_inner(conn, request));
        let result = match fetch.await {
            Ok(result) => result,
            Err(_) => {
                // The request future was dropped mid-flight; don't reuse the socket.
                conn.mark_broken();
                Err(FetchError::Timeout { after: self.timeout })
            }
        };

        metrics::record_fetch(result.is_ok(), start);
        if let Err(e) = &result {
            tracing::debug!(
                request_id = %request.request_id,
                connection_id = %conn.id(),
                error = %e,
                "Backend fetch failed"
            );
        }
        result
    }
}

/// Append `path` to the backend base URL and replace its query.
fn build_target(base: &Url, path: &str, query: &[(String, String)]) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(None);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url
}
