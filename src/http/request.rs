//! Request handling and classification.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) when the client did not send one
//! - Parse the query string into gateway parameters and forwardable ones
//! - Collect the request-scoped context handed to the orchestration layer
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `logout` is a presence-only marker; `?logout` with no value counts
//! - Gateway parameters (credentials included) are never forwarded upstream

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Query parameter carrying the username.
pub const USER_PARAM: &str = "user";
/// Query parameter carrying the password.
pub const PASSWORD_PARAM: &str = "password";
/// Presence-only query marker that ends the session.
pub const LOGOUT_PARAM: &str = "logout";

const GATEWAY_PARAMS: [&str; 3] = [USER_PARAM, PASSWORD_PARAM, LOGOUT_PARAM];

/// Generates a UUID v4 request ID for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Decoded query parameters in their original order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Parameters that may be passed on to the backend.
    pub fn forwardable(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .filter(|(k, _)| !GATEWAY_PARAMS.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (k, v) in &self.pairs {
            if k == PASSWORD_PARAM {
                list.entry(&(k, "<redacted>"));
            } else {
                list.entry(&(k, v));
            }
        }
        list.finish()
    }
}

/// Everything the orchestration layer needs to know about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request path, still percent-encoded.
    pub path: String,
    pub query: QueryParams,
    /// Value of the session cookie, if the client sent one.
    pub session_cookie: Option<String>,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, query: QueryParams) -> Self {
        Self {
            path: path.into(),
            query,
            session_cookie: None,
            request_id: "unknown".to_string(),
        }
    }

    pub fn with_session_cookie(mut self, value: impl Into<String>) -> Self {
        self.session_cookie = Some(value.into());
        self
    }
}
