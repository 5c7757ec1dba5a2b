//! Authenticating HTTP gateway library.
//!
//! Every `GET` is authenticated by query credentials or a session cookie, then
//! answered with content fetched from a single backend over a bounded pool of
//! connections.

pub mod auth;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;

pub use config::GatewayConfig;
pub use errors::GatewayError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
