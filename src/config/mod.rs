//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment variables / flags (main.rs, clap)
//!     → validation.rs (semantic checks, all errors reported)
//!     → BridgeConfig (validated, immutable)
//!     → shared via Arc with the dispatcher and control-plane client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - The shared secret is not configuration: only its path is, and the file
//!   is re-read on every auth attempt
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, AuthConfig, BridgeConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProtocolConfig,
};
pub use validation::{validate_config, ValidationError};
