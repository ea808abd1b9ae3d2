//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limit)
//!     → connection.rs (ID, tracking for graceful drain)
//!     → server.rs (one task per connection, CLI session loop)
//! ```
//!
//! # Design Decisions
//! - Bounded concurrency: a semaphore permit is held for each open session
//! - Each connection is tracked so shutdown can wait for sessions to end
//! - No TLS: the Varnish CLI protocol is plaintext with challenge-response auth

pub mod connection;
pub mod listener;
