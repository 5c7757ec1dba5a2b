//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway handler on every path
//! - Wire up middleware (panic isolation, timeout, request ID, tracing)
//! - Start the users file watcher when configured
//! - Serve until the shutdown signal fires

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{FileUserDirectory, UsersFileWatcher};
use crate::config::GatewayConfig;
use crate::gateway::{gateway_handler, Gateway};
use crate::http::request::MakeRequestUuidV4;
use crate::lifecycle::startup::{build_gateway, StartupError};
use crate::pool::ConnectionPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    pool: Arc<dyn ConnectionPool>,
    users_file: Option<Arc<FileUserDirectory>>,
}

impl HttpServer {
    /// Create a server with collaborators built from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let (gateway, users_file) = build_gateway(&config)?;
        let mut server = Self::with_gateway(config, gateway);
        server.users_file = users_file;
        Ok(server)
    }

    /// Create a server around an already assembled gateway.
    pub fn with_gateway(config: GatewayConfig, gateway: Gateway) -> Self {
        let pool = gateway.pool().clone();
        let router = build_router(&config, AppState { gateway });
        Self {
            router,
            config,
            pool,
            users_file: None,
        }
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// On shutdown the pool is closed first, so requests still waiting for a
    /// connection get a 503 instead of holding up the drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.address,
            pool_size = self.config.pool.size,
            "HTTP server starting"
        );

        // Held for the lifetime of the server; dropping it stops the watch.
        let _watcher = match (&self.users_file, self.config.users.watch) {
            (Some(directory), true) => match UsersFileWatcher::new(directory.clone()).run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to watch users file, continuing without reload"
                    );
                    None
                }
            },
            _ => None,
        };

        let pool = self.pool;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
                pool.close();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// The outer timeout answers 504, like the fetch timeout it backs up.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    Router::new()
        .route("/", get(gateway_handler))
        .route("/{*path}", get(gateway_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            config.timeouts.request(),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
