//! Varnish CLI bridge.
//!
//! Lets tools written for a Varnish management port (cache purge plugins,
//! `varnishadm`) drive an HTTP control-plane API instead.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                VARNISH CLI BRIDGE                │
//!                     │                                                  │
//!   CLI client        │  ┌─────────┐   ┌─────────┐   ┌──────────────┐    │
//!   ──────────────────┼─▶│   net   │──▶│ session │──▶│   backend    │────┼──▶ Control-plane
//!   (TCP, port 6082)  │  │listener │   │dispatch │   │ HTTP client  │    │    API (HTTPS)
//!                     │  └─────────┘   └────┬────┘   └──────────────┘    │
//!                     │                     │                            │
//!   ◀─────────────────┼──── protocol ◀──────┘                            │
//!     "%3d %-8d\n"    │   lexer / framer     auth ◀── secret file        │
//!                     │                                                  │
//!                     │  config · observability · lifecycle              │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use varnish_cli_bridge::config::{load_config, validate_config, BridgeConfig, ConfigError};
use varnish_cli_bridge::lifecycle::startup;
use varnish_cli_bridge::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "varnish-cli-bridge", version)]
#[command(about = "Varnish CLI protocol bridge to an HTTP cache control API", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "VARNISH_CLI_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address and port to listen for inbound Varnish CLI connections.
    #[arg(long, env = "VARNISH_CLI_BRIDGE_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path to file containing the Varnish CLI authentication secret.
    #[arg(long, env = "VARNISH_CLI_BRIDGE_SECRET_FILE")]
    secret_file: Option<PathBuf>,

    /// Absolute control-plane URL bans are POSTed to.
    #[arg(long, env = "SECTION_IO_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Username for API requests.
    #[arg(long, env = "SECTION_IO_USERNAME")]
    username: Option<String>,

    /// Password for API requests (environment only).
    #[arg(skip)]
    password: Option<String>,

    /// Proxy name targeted by bans.
    #[arg(long, env = "SECTION_IO_PROXY_NAME")]
    proxy_name: Option<String>,

    /// Varnish version to emulate in the banner.
    #[arg(long, env = "VARNISH_CLI_BRIDGE_VARNISH_VERSION")]
    varnish_version: Option<String>,

    /// Log level for this crate when RUST_LOG is unset.
    #[arg(long, env = "VARNISH_CLI_BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layer flags and environment over the file (or default) configuration.
    fn into_config(self) -> Result<BridgeConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(addr) = self.listen_address {
            config.listener.bind_address = addr;
        }
        if let Some(path) = self.secret_file {
            config.auth.secret_file = path.to_string_lossy().into_owned();
        }
        if let Some(endpoint) = self.api_endpoint {
            config.api.endpoint = endpoint;
        }
        if let Some(username) = self.username {
            config.api.username = username;
        }
        if let Some(password) = self.password {
            config.api.password = password;
        }
        if let Some(proxy_name) = self.proxy_name {
            config.api.proxy_name = proxy_name;
        }
        if let Some(version) = self.varnish_version {
            config.protocol.varnish_version = version;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();
    // Kept off the command line so it never shows up in `ps`.
    cli.password = std::env::var("SECTION_IO_PASSWORD").ok().filter(|p| !p.is_empty());

    let config = cli.into_config()?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        api_endpoint = %config.api.endpoint,
        proxy_name = %config.api.proxy_name,
        varnish_version = %config.protocol.varnish_version,
        "varnish-cli-bridge starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
