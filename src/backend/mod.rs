//! Control-plane API bridge.
//!
//! # Data Flow
//! ```text
//! Dispatcher (ban, ban.url, vcl.use)
//!     → ForwardRequest (types.rs)
//!     → ControlPlane::forward
//!         → client.rs (JSON POST, basic auth, bounded by timeout)
//!     → ForwardOutcome (Accepted | Rejected{status} | Failed)
//!     → CLI status 200 / 300
//! ```
//!
//! # Security Constraints
//! - Credentials never appear in logs or CLI responses
//! - Backend response bodies are logged at debug level only, never relayed
//! - Transport error detail stays in the server log

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::HttpControlPlane;
pub use types::{BackendError, ForwardOutcome, ForwardRequest};

/// Something that can apply bans and configuration updates to the cache fleet.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Forward one request. Failures are reported through the outcome; the
    /// implementation logs the detail.
    async fn forward(&self, request: ForwardRequest) -> ForwardOutcome;
}
