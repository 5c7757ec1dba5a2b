//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → Authenticator (cookie or query credentials)
//!         ✗ → GatewayError::Unauthorized (pool never touched)
//!     → ConnectionPool::acquire (bounded wait)
//!         ✗ → GatewayError::Pool
//!     → Fetcher::fetch within the connection scope
//!         ✗ → GatewayError::Fetch (connection still released)
//!     → FetchResult
//! ```

pub mod handler;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::auth::{Authenticator, SessionPolicy, UserDirectory};
use crate::errors::GatewayError;
use crate::fetch::{FetchRequest, FetchResult, Fetcher};
use crate::http::request::RequestContext;
use crate::pool::ConnectionPool;

pub use handler::gateway_handler;

/// The authorization gate in front of the backend.
///
/// Collaborators are injected as trait objects so any of them can be swapped
/// without touching the orchestration.
#[derive(Clone)]
pub struct Gateway {
    authenticator: Arc<Authenticator>,
    pool: Arc<dyn ConnectionPool>,
    fetcher: Arc<dyn Fetcher>,
    upstream_failure_status: StatusCode,
}

impl Gateway {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        pool: Arc<dyn ConnectionPool>,
        fetcher: Arc<dyn Fetcher>,
        session: SessionPolicy,
    ) -> Self {
        Self {
            authenticator: Arc::new(Authenticator::new(directory, session)),
            pool,
            fetcher,
            upstream_failure_status: StatusCode::BAD_GATEWAY,
        }
    }

    /// Status returned when the backend fails after a successful login.
    pub fn with_upstream_failure_status(mut self, status: StatusCode) -> Self {
        self.upstream_failure_status = status;
        self
    }

    pub fn session(&self) -> &SessionPolicy {
        self.authenticator.session()
    }

    pub fn upstream_failure_status(&self) -> StatusCode {
        self.upstream_failure_status
    }

    pub fn pool(&self) -> &Arc<dyn ConnectionPool> {
        &self.pool
    }

    /// Authenticate, then fetch the requested path over a pooled connection.
    pub async fn process(&self, ctx: &RequestContext) -> Result<FetchResult, GatewayError> {
        let identity = self
            .authenticator
            .authenticate(&ctx.query, ctx.session_cookie.as_deref())
            .await?;

        let conn = self.pool.acquire().await?;
        tracing::debug!(
            request_id = %ctx.request_id,
            identity = %identity,
            connection_id = %conn.id(),
            path = %ctx.path,
            "Forwarding authorized request"
        );

        let request = FetchRequest {
            path: ctx.path.clone(),
            query: ctx.query.forwardable(),
            request_id: ctx.request_id.clone(),
        };
        let result = self.fetcher.fetch(&conn, &request).await;
        drop(conn);

        result.map_err(GatewayError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryUserDirectory;
    use crate::fetch::FetchError;
    use crate::http::request::QueryParams;
    use crate::pool::{BackendConnection, BackendPool, PoolError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// Records every request and answers with a fixed result.
    struct StubFetcher {
        fail: bool,
        seen: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(
            &self,
            _conn: &BackendConnection,
            request: &FetchRequest,
        ) -> Result<FetchResult, FetchError> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            } else {
                Ok(FetchResult::ok("Hello, world right!"))
            }
        }
    }

    fn pool(size: usize) -> Arc<BackendPool> {
        Arc::new(BackendPool::new(
            Url::parse("http://127.0.0.1:1").unwrap(),
            size,
            Duration::from_millis(50),
            Duration::from_secs(1),
        ))
    }

    fn gateway(pool: Arc<BackendPool>, fetcher: Arc<StubFetcher>) -> Gateway {
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.insert("foo", "bar");
        Gateway::new(directory, pool, fetcher, SessionPolicy::default())
    }

    fn ctx(raw_query: &str) -> RequestContext {
        RequestContext::new("/anything", QueryParams::parse(Some(raw_query)))
    }

    #[tokio::test]
    async fn authorized_request_is_fetched() {
        let fetcher = Arc::new(StubFetcher::new(false));
        let gw = gateway(pool(1), fetcher.clone());

        let result = gw.process(&ctx("user=foo&password=bar&page=3")).await.unwrap();
        assert_eq!(result.body.as_ref(), b"Hello, world right!");

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen[0].path, "/anything");
        assert_eq!(seen[0].query, vec![("page".to_string(), "3".to_string())]);
    }

    #[tokio::test]
    async fn unauthorized_request_never_acquires() {
        let fetcher = Arc::new(StubFetcher::new(false));
        let pool = pool(1);
        // Hold the only slot: an acquisition attempt would fail with Exhausted.
        let _held = pool.acquire().await.unwrap();
        let gw = gateway(pool.clone(), fetcher.clone());

        let err = gw.process(&ctx("user=foo&password=ERROR")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_releases_connection() {
        let pool = pool(2);
        let gw = gateway(pool.clone(), Arc::new(StubFetcher::new(true)));
        let before = pool.available();

        let err = gw.process(&ctx("user=foo&password=bar")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Fetch(_)));
        assert_eq!(pool.available(), before);
    }

    #[tokio::test]
    async fn exhausted_pool_is_not_unauthorized() {
        let pool = pool(1);
        let _held = pool.acquire().await.unwrap();
        let gw = gateway(pool.clone(), Arc::new(StubFetcher::new(false)));

        let err = gw.process(&ctx("user=foo&password=bar")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Pool(PoolError::Exhausted { .. })));
    }

    #[tokio::test]
    async fn session_cookie_is_enough() {
        let fetcher = Arc::new(StubFetcher::new(false));
        let gw = gateway(pool(1), fetcher.clone());

        let ctx =
            RequestContext::new("/anything", QueryParams::default()).with_session_cookie("true");
        assert!(gw.process(&ctx).await.is_ok());
        assert_eq!(fetcher.seen.lock().unwrap().len(), 1);
    }
}
