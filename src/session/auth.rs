//! Challenge-response authentication.
//!
//! # Responsibilities
//! - Generate a fresh 32-letter challenge for every handshake
//! - Read the shared secret on every attempt (rotation needs no restart)
//! - Compare the client's hex digest with
//!   `SHA-256(challenge + "\n" + secret + challenge + "\n")`
//!
//! # Security Constraints
//! - The secret, the expected digest and the client's answer are never logged
//! - A challenge is consumed by the attempt that answers it
//! - Missing challenge and wrong answer look the same to the client

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::protocol::{Response, ResponseStatus};
use crate::session::state::Session;

/// Length of the challenge sent in the 107 response.
pub const CHALLENGE_LEN: usize = 32;

/// Errors reading the shared secret.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the shared secret comes from.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Load the current secret. Called once per authentication attempt.
    async fn load(&self) -> Result<Vec<u8>, SecretError>;
}

/// Secret stored in a file, re-read on every call.
#[derive(Debug, Clone)]
pub struct FileSecret {
    path: PathBuf,
}

impl FileSecret {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretSource for FileSecret {
    async fn load(&self) -> Result<Vec<u8>, SecretError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| SecretError::Read {
                path: self.path.clone(),
                source,
            })
    }
}

/// Result of checking a client's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Accepted,
    Rejected,
}

/// Draw a challenge of lowercase letters from the OS random source.
pub fn generate_challenge() -> Result<String, rand::Error> {
    let mut bytes = [0u8; CHALLENGE_LEN];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes.iter().map(|b| char::from(b'a' + b % 26)).collect())
}

/// Issue a fresh challenge, remember it on the session, and build the 107
/// response carrying it.
pub fn issue_challenge(session: &mut Session) -> Response {
    match generate_challenge() {
        Ok(challenge) => {
            session.set_challenge(challenge.clone());
            tracing::debug!(connection_id = %session.id(), "Issued auth challenge");
            Response::new(ResponseStatus::Auth, challenge)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate auth challenge");
            Response::new(
                ResponseStatus::Cant,
                "Failed to generate an authentication challenge.",
            )
        }
    }
}

/// Lowercase hex digest the client must send back for `challenge`.
pub fn expected_response(challenge: &str, secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    hasher.update(b"\n");
    hasher.update(secret);
    hasher.update(challenge.as_bytes());
    hasher.update(b"\n");
    hex::encode(hasher.finalize())
}

/// Check `supplied` against the session's outstanding challenge.
///
/// The challenge is consumed either way. On success the session becomes
/// authenticated; on failure it is left unauthenticated and the caller must
/// issue a new challenge.
pub fn check_response(session: &mut Session, supplied: &str, secret: &[u8]) -> AuthResult {
    let accepted = match session.take_challenge() {
        // Hex is compared case-insensitively; surrounding whitespace is not trimmed.
        Some(challenge) => expected_response(&challenge, secret).eq_ignore_ascii_case(supplied),
        None => false,
    };

    session.set_authenticated(accepted);
    if accepted {
        AuthResult::Accepted
    } else {
        AuthResult::Rejected
    }
}
