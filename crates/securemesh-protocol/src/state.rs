//! Handshake state machine
//!
//! ```text
//! Connecting -> KeyNegotiation -> Authenticating -> Dispatching -> Closed
//!           \_____(cached key)___/
//! ```
//!
//! Any state may move to `Closed`; nothing leaves `Closed`.

use crate::error::{ProtocolError, Result};
use std::fmt;
use tracing::debug;

/// Handshake progress of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Identity exchange (`id`, `known`)
    Connecting,
    /// Ephemeral EC exchange and key derivation
    KeyNegotiation,
    /// Secret verification under the session key
    Authenticating,
    /// Handler running
    Dispatching,
    /// Terminal state
    Closed { success: bool },
}

impl HandshakeState {
    pub fn is_closed(self) -> bool {
        matches!(self, HandshakeState::Closed { .. })
    }

    fn can_advance_to(self, next: HandshakeState) -> bool {
        use HandshakeState::*;

        match (self, next) {
            (Closed { .. }, _) => false,
            (_, Closed { .. }) => true,
            (Connecting, KeyNegotiation) | (Connecting, Authenticating) => true,
            (KeyNegotiation, Authenticating) => true,
            (Authenticating, Dispatching) => true,
            _ => false,
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Connecting => write!(f, "Connecting"),
            HandshakeState::KeyNegotiation => write!(f, "KeyNegotiation"),
            HandshakeState::Authenticating => write!(f, "Authenticating"),
            HandshakeState::Dispatching => write!(f, "Dispatching"),
            HandshakeState::Closed { success: true } => write!(f, "Closed(ok)"),
            HandshakeState::Closed { success: false } => write!(f, "Closed(error)"),
        }
    }
}

/// Tracks the state of one handshake and logs every transition
#[derive(Debug)]
pub struct HandshakeTracker {
    role: &'static str,
    peer: String,
    state: HandshakeState,
}

impl HandshakeTracker {
    pub fn new(role: &'static str) -> Self {
        HandshakeTracker {
            role,
            peer: String::new(),
            state: HandshakeState::Connecting,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Attach the remote id once it is known
    pub fn set_peer(&mut self, peer: &str) {
        self.peer = peer.to_string();
    }

    pub fn advance(&mut self, next: HandshakeState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(ProtocolError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(role = self.role, peer = %self.peer, "{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Move to `Closed`; a tracker that is already closed keeps its outcome
    pub fn close(&mut self, success: bool) {
        if !self.state.is_closed() {
            let next = HandshakeState::Closed { success };
            debug!(role = self.role, peer = %self.peer, "{} -> {}", self.state, next);
            self.state = next;
        }
    }
}
