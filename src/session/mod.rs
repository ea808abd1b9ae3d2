//! Per-connection CLI session engine.
//!
//! # Data Flow
//! ```text
//! tokens (protocol::lexer)
//!     → dispatch.rs (case check, command lookup, auth gate, arity)
//!         → auth.rs (challenge / verify against the secret file)
//!         → commands.rs (static banner, help, param.show tables)
//!         → vcl.rs (process-wide inline VCL slot)
//!         → backend::ControlPlane (ban, vcl.use)
//!     → exactly one Response per request line
//! ```
//!
//! # State Machine
//! ```text
//!   Unauthenticated ──auth ok──▶ Authenticated
//!         ▲                            │
//!         └────────auth failed─────────┘
//! ```
//!
//! # Design Decisions
//! - `Session` is owned by its connection task and passed `&mut`, never shared
//! - The dispatcher is shared (`Arc`) and holds only immutable config plus the
//!   inline VCL slot
//! - Unknown commands answer 102 in either state; known commands that need
//!   auth answer with a fresh challenge while unauthenticated

pub mod auth;
pub mod commands;
pub mod dispatch;
pub mod state;
pub mod vcl;

pub use auth::{FileSecret, SecretError, SecretSource};
pub use commands::Command;
pub use dispatch::{Dispatcher, DispatcherSettings};
pub use state::Session;
pub use vcl::InlineVclSlot;
