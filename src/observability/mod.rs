//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connection tasks, dispatcher, control-plane client produce:
//!     → logging.rs (structured tracing events, per-connection spans)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Connection ID is a span field, so every event inside a session carries it
//! - Secrets, passwords and auth answers are never recorded
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
