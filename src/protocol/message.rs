//! Protocol message types

use super::packstream::Value;
use std::collections::BTreeMap;

/// Frontend message (client → server)
#[derive(Clone)]
pub enum FrontendMessage {
    /// Login request
    Init {
        /// Client name and version, e.g. `bolt-wire/0.1.0`
        user_agent: String,
        /// Authentication token (scheme, principal, credentials, ...)
        auth_token: BTreeMap<String, Value>,
    },
}

impl std::fmt::Debug for FrontendMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // The auth token carries credentials
            FrontendMessage::Init { user_agent, .. } => f
                .debug_struct("Init")
                .field("user_agent", user_agent)
                .field("auth_token", &"<redacted>")
                .finish(),
        }
    }
}

/// Backend message (server → client)
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Request succeeded
    Success(BTreeMap<String, Value>),

    /// Result record
    Record(Vec<Value>),

    /// Request ignored after an earlier failure
    Ignored,

    /// Request failed
    Failure(FailureFields),
}

/// Fields of a FAILURE message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureFields {
    /// Status code, e.g. `Neo.ClientError.Security.Unauthorized`
    pub code: Option<String>,
    /// Human-readable message
    pub message: Option<String>,
}

impl std::fmt::Display for FailureFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}", msg)?,
            None => write!(f, "unknown failure")?,
        }
        if let Some(ref code) = self.code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}
