//! Connection state machine

use crate::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket established (plain or TLS), nothing exchanged yet
    Initial,

    /// Handshake sent, awaiting the server's version choice
    Handshaking,

    /// INIT sent, awaiting the login summary
    Authenticating,

    /// Logged in
    Ready,

    /// Closed
    Closed,
}

impl ConnectionState {
    /// Login runs strictly forward; any state may close
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Initial, Handshaking)
                | (Handshaking, Authenticating)
                | (Authenticating, Ready)
                | (_, Closed)
        )
    }

    /// Move to `next`, or fail with [`Error::InvalidState`] leaving `self` unchanged
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("a state reachable from {}", self),
                actual: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Handshaking => write!(f, "handshaking"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
