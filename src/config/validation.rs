//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses parse and the API endpoint is an http(s) URL
//! - Check required credentials are present and ranges are positive
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before the listener binds

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BridgeConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn missing(field: &'static str) -> ValidationError {
    ValidationError::Missing { field }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Check the whole configuration, collecting every error.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.socket_addr() {
        errors.push(invalid("listener.bind_address", e.to_string()));
    }
    if config.listener.max_connections == 0 {
        errors.push(invalid("listener.max_connections", "must be greater than 0"));
    }
    if config.listener.max_line_bytes == 0 {
        errors.push(invalid("listener.max_line_bytes", "must be greater than 0"));
    }

    if config.auth.secret_file.trim().is_empty() {
        errors.push(missing("auth.secret_file"));
    }

    let api = &config.api;
    if api.endpoint.is_empty() {
        errors.push(missing("api.endpoint"));
    } else {
        match Url::parse(&api.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => errors.push(invalid("api.endpoint", "must be an http:// or https:// URL")),
            Err(e) => errors.push(invalid("api.endpoint", e.to_string())),
        }
    }
    if api.username.is_empty() {
        errors.push(missing("api.username"));
    }
    if api.password.is_empty() {
        errors.push(missing("api.password"));
    }
    if api.proxy_name.is_empty() {
        errors.push(missing("api.proxy_name"));
    }
    if api.timeout_secs == 0 {
        errors.push(invalid("api.timeout_secs", "must be greater than 0"));
    }

    if config.protocol.varnish_version.trim().is_empty() {
        errors.push(missing("protocol.varnish_version"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        if let Err(e) = observability.metrics_address.parse::<SocketAddr>() {
            errors.push(invalid("observability.metrics_address", e.to_string()));
        }
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

    fn valid_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.api.endpoint = "https://api.example.com/account/1/state".to_string();
        config.api.username = "ops".to_string();
        config.api.password = "secret".to_string();
        config
    }

    #[test]
    fn complete_config_is_valid() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn default_config_lacks_api_credentials() {
        let errors = validate_config(&BridgeConfig::default()).unwrap_err();
        assert!(errors.contains(&missing("api.endpoint")));
        assert!(errors.contains(&missing("api.username")));
        assert!(errors.contains(&missing("api.password")));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-address".to_string();
        config.listener.max_connections = 0;
        config.api.endpoint = "ftp://example.com/".to_string();
        config.api.proxy_name.clear();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(errors.len(), 4, "{:?}", fields);
        assert!(fields.iter().any(|f| f.starts_with("api.endpoint is invalid")));
        assert!(fields.iter().any(|f| f == "api.proxy_name is required"));
    }

    #[test]
    fn hostless_listen_address_is_valid() {
        let mut config = valid_config();
        config.listener.bind_address = ":6082".to_string();
        assert_eq!(validate_config(&config), Ok(()));

        config.listener.bind_address = ":nope".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().starts_with("listener.bind_address is invalid"));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "nope".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
