//! Session state owned by one connection.

use crate::net::connection::ConnectionId;

/// Mutable per-connection protocol state.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    authenticated: bool,
    challenge: Option<String>,
}

impl Session {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            authenticated: false,
            challenge: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The challenge most recently sent to the client, if still outstanding.
    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    pub(crate) fn set_challenge(&mut self, challenge: String) {
        self.challenge = Some(challenge);
    }

    /// Remove the outstanding challenge so it cannot be answered twice.
    pub(crate) fn take_challenge(&mut self) -> Option<String> {
        self.challenge.take()
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }
}
