//! A single backend connection.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the HTTP client bound to the backend base URL
//! - Remember whether the transport failed so the pool can discard it

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A connection to the protected backend.
///
/// Each connection owns a client that keeps at most one idle keep-alive
/// socket, so a checked-out connection maps to one backend socket.
pub struct BackendConnection {
    id: ConnectionId,
    base_url: Url,
    client: Client<HttpConnector, Body>,
    broken: AtomicBool,
}

impl BackendConnection {
    /// Prepare a connection. The socket itself is opened on first use.
    pub fn open(base_url: Url, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(1)
            .build(connector);

        let id = ConnectionId::new();
        tracing::trace!(connection_id = %id, backend = %base_url, "Backend connection created");

        Self {
            id,
            base_url,
            client,
            broken: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    /// Flag the connection so it is closed instead of recycled.
    pub fn mark_broken(&self) {
        self.broken.store(true, Ordering::Relaxed);
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConnection")
            .field("id", &self.id)
            .field("base_url", &self.base_url.as_str())
            .field("broken", &self.is_broken())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[tokio::test]
    async fn broken_flag() {
        let conn = BackendConnection::open(
            Url::parse("http://127.0.0.1:1").unwrap(),
            Duration::from_secs(1),
        );
        assert!(!conn.is_broken());
        conn.mark_broken();
        assert!(conn.is_broken());
    }
}
