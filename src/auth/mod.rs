//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (query params, session cookie)
//!     → session.rs (is the cookie an established session?)
//!     → authenticator.rs (otherwise: user/password from the query)
//!     → directory.rs (stored password lookup)
//!     → Identity or GatewayError::Unauthorized
//!
//! Users file (optional):
//!     watcher.rs detects change
//!     → directory.rs reloads and swaps the map atomically
//! ```
//!
//! # Design Decisions
//! - The session cookie is an unsigned marker; see `session.rs`
//! - Failures are stateless and immediate (no lockout, no rate limiting)
//! - Directory errors are distinct from "unknown user" and never become 401

pub mod authenticator;
pub mod directory;
pub mod session;
pub mod watcher;

pub use authenticator::{Authenticator, Credential, Identity};
pub use directory::{
    DirectoryError, FileUserDirectory, InMemoryUserDirectory, StoredUser, UserDirectory,
};
pub use session::SessionPolicy;
pub use watcher::UsersFileWatcher;
