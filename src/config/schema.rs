//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file. Every
//! field has a default so a file only needs the values it overrides.

use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// CLI listener settings.
    pub listener: ListenerConfig,

    /// Shared-secret authentication.
    pub auth: AuthConfig,

    /// Control-plane API.
    pub api: ApiConfig,

    /// Emulated Varnish behaviour.
    pub protocol: ProtocolConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:6082").
    pub bind_address: String,

    /// Maximum concurrent CLI connections.
    pub max_connections: usize,

    /// Longest accepted request line, in bytes.
    pub max_line_bytes: usize,

    /// Seconds to wait for open sessions after shutdown is signalled.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6082".to_string(),
            max_connections: 1024,
            max_line_bytes: 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}

impl ListenerConfig {
    /// Parse `bind_address`. A host-less `:port` binds every IPv4 interface.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        match self.bind_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port).parse(),
            None => self.bind_address.parse(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// File holding the Varnish CLI secret.
    pub secret_file: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_file: "/etc/varnish/secret".to_string(),
        }
    }
}

/// Control-plane API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Absolute http(s) URL bans are POSTed to.
    pub endpoint: String,

    /// Basic-auth username.
    pub username: String,

    /// Basic-auth password. Prefer the environment over the config file.
    pub password: String,

    /// Proxy the bans target.
    pub proxy_name: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// `personality` sent with configuration updates.
    pub personality: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            proxy_name: "varnish".to_string(),
            timeout_secs: 60,
            personality: "MagentoTurpentine".to_string(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("proxy_name", &self.proxy_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("personality", &self.personality)
            .finish()
    }
}

/// Emulated Varnish behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Version reported in the banner (`varnish-<version>`); its major
    /// number also selects the `param.show` layout.
    pub varnish_version: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            varnish_version: "4.1.1".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for this crate when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9102".to_string(),
        }
    }
}
