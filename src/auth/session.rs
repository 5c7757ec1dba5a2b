//! Session cookie handling.
//!
//! The session is nothing but a marker cookie. It carries no signature and no
//! server-side expiry: a client presenting `<cookie_name>=<cookie_value>` is
//! treated as already authenticated. Max-Age only controls how long the
//! browser keeps it.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SessionConfig;

/// How session cookies are named, recognised and issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    cookie_name: String,
    cookie_value: String,
    ttl: Duration,
}

impl SessionPolicy {
    pub fn new(
        cookie_name: impl Into<String>,
        cookie_value: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            cookie_value: cookie_value.into(),
            ttl,
        }
    }

    /// Value of the session cookie in the request, if any.
    ///
    /// Looks through every `Cookie` header since HTTP/2 clients may split them.
    pub fn read_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == self.cookie_name).then(|| value.trim_matches('"').to_string())
            })
    }

    /// Whether a presented cookie value counts as an established session.
    pub fn is_valid(&self, value: &str) -> bool {
        value == self.cookie_value
    }

    /// `Set-Cookie` value that starts or refreshes a session.
    pub fn issue_cookie(&self) -> HeaderValue {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            self.cookie_value,
            self.ttl.as_secs()
        );
        to_header_value(cookie)
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear_cookie(&self) -> HeaderValue {
        let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.cookie_name);
        to_header_value(cookie)
    }
}

/// RFC 6265 `cookie-octet`: printable ASCII except `"`, `,`, `;` and `\`.
pub fn is_cookie_octet(c: char) -> bool {
    matches!(c, '\x21' | '\x23'..='\x2B' | '\x2D'..='\x3A' | '\x3C'..='\x5B' | '\x5D'..='\x7E')
}

// Config validation restricts the name and value to cookie octets, so the
// formatted string is always a legal header value.
fn to_header_value(cookie: String) -> HeaderValue {
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self::new(
            config.cookie_name.clone(),
            config.cookie_value.clone(),
            Duration::from_secs(config.ttl_secs),
        )
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}
