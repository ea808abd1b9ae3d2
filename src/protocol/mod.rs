//! Varnish CLI wire protocol.
//!
//! # Data Flow
//! ```text
//! Request line (bytes, LF-terminated)
//!     → lexer.rs (shell-style tokens: quotes, backslash escapes)
//!     → session dispatcher
//!     → framer.rs ("%3d %-8d\n" + body + "\n")
//!     → client socket
//! ```
//!
//! # Design Decisions
//! - Lexer and framer are pure functions with no I/O
//! - Status codes are a closed enum, never built from raw integers
//! - Malformed escapes degrade to literal passthrough, never to an error

pub mod framer;
pub mod lexer;
pub mod status;

pub use framer::{frame, write_response, Response};
pub use lexer::{quote_args, read_token, tokenize};
pub use status::ResponseStatus;
