//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, query parsing, RequestContext)
//!     → gateway::handler (logout, authenticate, fetch)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{QueryParams, RequestContext, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
