//! Backend connection pool.
//!
//! # Data Flow
//! ```text
//! Authenticated request
//!     → acquire() waits (bounded) for a free slot
//!     → reuse an idle BackendConnection, or open a new one
//!     → PooledConnection guard handed to the fetcher
//!     → guard dropped on every exit path (success, error, panic, cancellation)
//!         → connection pushed back to the idle list (or discarded if broken)
//!         → slot released
//! ```
//!
//! # Design Decisions
//! - A semaphore bounds checked-out connections; the idle list only recycles
//! - Release happens in `Drop`, so no code path can leak a slot
//! - Exhaustion is a distinct error after `acquire_timeout`, never an endless wait

pub mod connection;

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::{BackendConfig, PoolConfig};
use crate::observability::metrics;

pub use connection::{BackendConnection, ConnectionId};

/// Errors raised while checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became free within the bounded wait.
    #[error("no backend connection available after {waited:?}")]
    Exhausted { waited: Duration },
    /// The pool was shut down.
    #[error("connection pool closed")]
    Closed,
}

/// Hands out scoped backend connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Check out a connection for exclusive use until the guard is dropped.
    async fn acquire(&self) -> Result<PooledConnection, PoolError>;

    /// Connections that could be checked out right now.
    fn available(&self) -> usize;

    /// Total number of connection slots.
    fn size(&self) -> usize;

    /// Refuse all future acquisitions. Connections already out are unaffected.
    fn close(&self) {}
}

struct PoolShared {
    base_url: Url,
    connect_timeout: Duration,
    idle: Mutex<Vec<Arc<BackendConnection>>>,
    permits: Arc<Semaphore>,
    opened: AtomicU64,
}

impl PoolShared {
    fn release(&self, conn: &Arc<BackendConnection>) {
        if conn.is_broken() {
            tracing::debug!(connection_id = %conn.id(), "Discarding broken backend connection");
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn.clone());
    }
}

/// Fixed-size pool of connections to one backend.
pub struct BackendPool {
    shared: Arc<PoolShared>,
    size: usize,
    acquire_timeout: Duration,
}

impl BackendPool {
    pub fn new(
        base_url: Url,
        size: usize,
        acquire_timeout: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                base_url,
                connect_timeout,
                idle: Mutex::new(Vec::with_capacity(size)),
                permits: Arc::new(Semaphore::new(size)),
                opened: AtomicU64::new(0),
            }),
            size,
            acquire_timeout,
        }
    }

    /// Build a pool from configuration.
    pub fn from_config(
        pool: &PoolConfig,
        backend: &BackendConfig,
    ) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&backend.address)?;
        Ok(Self::new(
            base_url,
            pool.size,
            pool.acquire_timeout(),
            backend.connect_timeout(),
        ))
    }

    /// Connections waiting in the idle list.
    pub fn idle_count(&self) -> usize {
        self.shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Connections opened over the pool's lifetime.
    pub fn opened_count(&self) -> u64 {
        self.shared.opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionPool for BackendPool {
    async fn acquire(&self) -> Result<PooledConnection, PoolError> {
        let permit = match tokio::time::timeout(
            self.acquire_timeout,
            self.shared.permits.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                return Err(PoolError::Exhausted {
                    waited: self.acquire_timeout,
                })
            }
        };

        let recycled = self
            .shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let conn = match recycled {
            Some(conn) => conn,
            None => {
                self.shared.opened.fetch_add(1, Ordering::Relaxed);
                Arc::new(BackendConnection::open(
                    self.shared.base_url.clone(),
                    self.shared.connect_timeout,
                ))
            }
        };

        metrics::set_pool_available(self.shared.permits.available_permits());
        tracing::trace!(
            connection_id = %conn.id(),
            available = self.shared.permits.available_permits(),
            "Backend connection acquired"
        );

        Ok(PooledConnection {
            conn,
            shared: self.shared.clone(),
            _permit: permit,
        })
    }

    fn available(&self) -> usize {
        self.shared.permits.available_permits()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn close(&self) {
        self.shared.permits.close();
        self.shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A RAII guard over a checked-out connection.
///
/// Dropping it returns the connection to the pool and frees the slot.
pub struct PooledConnection {
    conn: Arc<BackendConnection>,
    shared: Arc<PoolShared>,
    // Dropped after `Drop::drop` has returned the connection to the idle list.
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = BackendConnection;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledConnection").field(&*self.conn).finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.shared.release(&self.conn);
        // The permit is still held here, so report the count it will have.
        metrics::set_pool_available(self.shared.permits.available_permits() + 1);
        tracing::trace!(connection_id = %self.conn.id(), "Backend connection released");
    }
}
