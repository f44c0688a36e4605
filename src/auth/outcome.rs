//! Authentication result mapping

use crate::protocol::{BackendMessage, Value};
use crate::Error;

/// Result of the INIT exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Server accepted the credentials
    Authenticated {
        /// Server agent string, e.g. `Neo4j/3.4.0`
        server: Option<String>,
    },
    /// Server refused the credentials
    Rejected {
        /// Server status code
        code: Option<String>,
        /// Human-readable message
        message: String,
    },
    /// Connection dropped or the server answered out of protocol
    ProtocolError(String),
}

impl AuthOutcome {
    /// Whether the server accepted the credentials
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Convert a failed outcome into the error surfaced to callers.
    ///
    /// Returns `None` for [`AuthOutcome::Authenticated`].
    pub fn into_error(self) -> Option<Error> {
        match self {
            Self::Authenticated { .. } => None,
            Self::Rejected { code, message } => Some(Error::Authentication { code, message }),
            Self::ProtocolError(detail) => Some(Error::Protocol(detail)),
        }
    }
}

/// Map the server's reply to INIT.
///
/// `None` means the connection closed before a reply arrived.
pub fn map_init_response(response: Option<BackendMessage>) -> AuthOutcome {
    match response {
        Some(BackendMessage::Success(metadata)) => AuthOutcome::Authenticated {
            server: metadata
                .get("server")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        Some(BackendMessage::Failure(failure)) => AuthOutcome::Rejected {
            message: failure
                .message
                .clone()
                .unwrap_or_else(|| "authentication failed".to_string()),
            code: failure.code,
        },
        Some(BackendMessage::Ignored) => {
            AuthOutcome::ProtocolError("server ignored the INIT request".into())
        }
        Some(other) => {
            AuthOutcome::ProtocolError(format!("unexpected reply to INIT: {:?}", other))
        }
        None => AuthOutcome::ProtocolError("connection closed during authentication".into()),
    }
}
