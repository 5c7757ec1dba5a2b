//! Configuration validation.
//!
//! Serde handles the syntactic checks. This module covers the semantic ones:
//! value ranges, parseable addresses and a usable cookie name. All errors are
//! collected rather than stopping at the first.

use std::net::SocketAddr;
use url::Url;

use crate::auth::session::is_cookie_octet;
use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.backend.address) {
        Ok(url) if url.scheme() == "http" => {}
        Ok(url) => errors.push(ValidationError::new(
            "backend.address",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("backend.address", e.to_string())),
    }

    if config.backend.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.connect_timeout_secs", "must be greater than 0"));
    }
    if config.backend.fetch_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.fetch_timeout_secs", "must be greater than 0"));
    }
    if config.backend.max_body_bytes == 0 {
        errors.push(ValidationError::new("backend.max_body_bytes", "must be greater than 0"));
    }

    if config.pool.size == 0 {
        errors.push(ValidationError::new("pool.size", "must be greater than 0"));
    }
    if config.pool.acquire_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.acquire_timeout_ms", "must be greater than 0"));
    }

    let name = &config.session.cookie_name;
    if name.is_empty() || !name.chars().all(|c| is_cookie_octet(c) && c != '=') {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be non-empty printable ASCII without '=', '\"', ',', ';' or '\\'",
        ));
    }
    let value = &config.session.cookie_value;
    if value.is_empty() || !value.chars().all(is_cookie_octet) {
        errors.push(ValidationError::new(
            "session.cookie_value",
            "must be non-empty printable ASCII without '\"', ',', ';' or '\\'",
        ));
    }

    // 401 is reserved for authentication failures.
    if !(500..=599).contains(&config.gateway.upstream_failure_status) {
        errors.push(ValidationError::new(
            "gateway.upstream_failure_status",
            format!("{} is not a 5xx status", config.gateway.upstream_failure_status),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else {
        // The pool wait and the fetch must both fit inside the request timeout
        // so their own 503/504 mapping is what the client sees.
        let inner = config.pool.acquire_timeout() + config.backend.fetch_timeout();
        if inner >= config.timeouts.request() {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "must exceed pool.acquire_timeout_ms + backend.fetch_timeout_secs ({inner:?})"
                ),
            ));
        }
    }

    if config.users.watch && config.users.file.is_none() {
        errors.push(ValidationError::new("users.watch", "requires users.file"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.pool.size = 0;
        config.backend.address = "ftp://files.local".into();
        config.session.cookie_name = "bad name".into();
        config.gateway.upstream_failure_status = 401;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "backend.address",
                "pool.size",
                "session.cookie_name",
                "gateway.upstream_failure_status",
            ]
        );
    }

    #[test]
    fn request_timeout_must_cover_pool_wait_and_fetch() {
        let mut config = GatewayConfig::default();
        config.backend.fetch_timeout_secs = 5;
        config.timeouts.request_secs = 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "timeouts.request_secs");

        // 2s wait + 10s fetch against 12s leaves no room for the inner mapping.
        let mut config = GatewayConfig::default();
        config.pool.acquire_timeout_ms = 2000;
        config.backend.fetch_timeout_secs = 10;
        config.timeouts.request_secs = 12;
        assert!(validate_config(&config).is_err());

        config.timeouts.request_secs = 13;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn cookie_value_must_be_cookie_octets() {
        for bad in ["", "a b", "\"true\"", "tr\x01ue", "a;b", "a\\b", "é"] {
            let mut config = GatewayConfig::default();
            config.session.cookie_value = bad.into();
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors[0].field, "session.cookie_value", "{bad:?}");
        }

        let mut config = GatewayConfig::default();
        config.session.cookie_value = "s3ss!on-ok".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn watch_requires_file() {
        let mut config = GatewayConfig::default();
        config.users.watch = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "users.watch");
    }
}
