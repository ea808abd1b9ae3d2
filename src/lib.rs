//! Varnish CLI bridge library.
//!
//! Speaks the Varnish management-CLI protocol on a TCP port and forwards
//! bans and configuration updates to an HTTP control-plane API.

pub mod backend;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::BridgeConfig;
pub use lifecycle::Shutdown;
pub use server::BridgeServer;
