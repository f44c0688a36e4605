//! Error types

use crate::trust::ServerIdentity;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bolt-wire operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (detected before any I/O)
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested feature is not available in this build
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Transport-level I/O error (DNS, connect, read, write)
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Connection establishment exceeded the configured timeout
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Server closed the connection unexpectedly
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Server certificate was not trusted
    #[error("server certificate for {identity} rejected: {reason}")]
    TrustRejected {
        /// Server the certificate was presented by
        identity: ServerIdentity,
        /// Why the certificate was rejected
        reason: String,
    },

    /// Server rejected the supplied credentials
    #[error("authentication failed: {message}")]
    Authentication {
        /// Server status code (e.g. `Neo.ClientError.Security.Unauthorized`)
        code: Option<String>,
        /// Human-readable message
        message: String,
    },

    /// Protocol violation or unexpected message
    #[error("protocol error: {0}")]
    Protocol(String),

    /// TLS failure unrelated to the trust decision
    #[error("tls error: {0}")]
    Tls(String),

    /// Invalid connection state transition
    #[error("invalid connection state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Known hosts table could not be read or written
    #[error("certificate store error at {}: {reason}", path.display())]
    Store {
        /// Path of the known_hosts table
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },
}

/// Coarse classification of [`Error`] for retry and reporting policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid strategy/topology combination
    Configuration,
    /// Feature selected that this build does not provide
    NotImplemented,
    /// DNS, connect, timeout or drop
    Transport,
    /// Certificate pin mismatch or chain validation failure
    TrustRejected,
    /// Bad credentials
    AuthenticationRejected,
    /// Malformed or unexpected traffic
    Protocol,
    /// Local known_hosts table failure
    Store,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::Io(_) | Error::ConnectTimeout(_) | Error::ConnectionClosed => {
                ErrorKind::Transport
            }
            Error::TrustRejected { .. } => ErrorKind::TrustRejected,
            Error::Authentication { .. } => ErrorKind::AuthenticationRejected,
            Error::Protocol(_) | Error::Tls(_) | Error::InvalidState { .. } => {
                ErrorKind::Protocol
            }
            Error::Store { .. } => ErrorKind::Store,
        }
    }

    /// Whether a caller may reasonably retry the operation.
    ///
    /// Only transport failures qualify; nothing is retried inside this crate.
    pub fn is_retriable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Short label used for metrics and logs
    pub fn category(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "configuration",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::Transport => "transport",
            ErrorKind::TrustRejected => "trust_rejected",
            ErrorKind::AuthenticationRejected => "authentication_rejected",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Store => "store",
        }
    }

    pub(crate) fn store(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Store {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let auth = Error::Authentication {
            code: Some("Neo.ClientError.Security.Unauthorized".into()),
            message: "bad credentials".into(),
        };
        let trust = Error::TrustRejected {
            identity: ServerIdentity::new("localhost", 7687),
            reason: "certificate changed".into(),
        };
        let transport = Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));

        assert_eq!(auth.kind(), ErrorKind::AuthenticationRejected);
        assert_eq!(trust.kind(), ErrorKind::TrustRejected);
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert_ne!(auth.kind(), trust.kind());
    }

    #[test]
    fn test_only_transport_is_retriable() {
        assert!(Error::ConnectionClosed.is_retriable());
        assert!(Error::ConnectTimeout(Duration::from_secs(1)).is_retriable());
        assert!(!Error::Config("x".into()).is_retriable());
        assert!(!Error::NotImplemented("x".into()).is_retriable());
        assert!(!Error::TrustRejected {
            identity: ServerIdentity::new("h", 1),
            reason: "r".into(),
        }
        .is_retriable());
    }

    #[test]
    fn test_trust_rejected_display_names_server() {
        let err = Error::TrustRejected {
            identity: ServerIdentity::new("db.local", 7687),
            reason: "certificate changed since first use".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("db.local:7687"));
        assert!(msg.contains("certificate changed since first use"));
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Error::Config("x".into()).category(), "configuration");
        assert_eq!(Error::Protocol("x".into()).category(), "protocol");
        assert_eq!(Error::store("/tmp/kh", "boom").category(), "store");
    }
}
