//! Connection URI parsing
//!
//! Supports formats:
//! * bolt://[user[:password]@]host[:port][?params] (single server)
//! * bolt+routing://[user[:password]@]host[:port][?params] (routing, seed address)
//! * neo4j://... (routing, same as bolt+routing)
//!
//! Recognised query parameters are `encrypted=true|false` and `trust=<strategy>`.
//! Any other parameter is routing context and only allowed on routing URIs.

use crate::auth::AuthToken;
use crate::protocol::constants::DEFAULT_PORT;
use crate::trust::{ServerIdentity, TrustStrategyKind};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Parsed connection info
#[derive(Clone, PartialEq)]
pub struct ConnectionInfo {
    /// Whether the URI asks for cluster routing
    pub routing: bool,
    /// Server address (seed address for routing URIs)
    pub address: ServerIdentity,
    /// Username
    pub user: Option<String>,
    /// Password
    pub password: Option<String>,
    /// `encrypted` query parameter
    pub encrypted: Option<bool>,
    /// `trust` query parameter
    pub trust: Option<TrustStrategyKind>,
    /// Remaining query parameters, passed to the routing layer
    pub routing_context: BTreeMap<String, String>,
}

/// Extract a query parameter value from a query string
fn parse_query_param(query_string: &str, param: &str) -> Option<String> {
    if query_string.is_empty() {
        return None;
    }

    // Remove leading '?' if present
    let query = query_string.trim_start_matches('?');

    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == param {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::Config(format!(
            "invalid value '{}' for {}: expected true or false",
            value, key
        ))),
    }
}

impl ConnectionInfo {
    /// Parse connection URI
    pub fn parse(s: &str) -> Result<Self> {
        let (routing, rest) = if let Some(rest) = s.strip_prefix("bolt://") {
            (false, rest)
        } else if let Some(rest) = s
            .strip_prefix("bolt+routing://")
            .or_else(|| s.strip_prefix("neo4j://"))
        {
            (true, rest)
        } else {
            return Err(Error::Config(format!(
                "unsupported URI '{}': expected bolt://, bolt+routing:// or neo4j://",
                s
            )));
        };

        // Split off query string before parsing host/port
        let (rest, query_string) = match rest.find('?') {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };

        // Format: [user[:password]@]host[:port][/]
        let (auth, host_port) = match rest.rfind('@') {
            Some(pos) => (Some(&rest[..pos]), &rest[pos + 1..]),
            None => (None, rest),
        };

        let (user, password) = match auth {
            Some(auth) => match auth.split_once(':') {
                Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
                None => (Some(auth.to_string()), None),
            },
            None => (None, None),
        };

        let host_port = host_port.trim_end_matches('/');
        if host_port.contains('/') {
            return Err(Error::Config(format!(
                "unexpected path in URI '{}'",
                s
            )));
        }
        let address = if host_port.is_empty() {
            ServerIdentity::new("localhost", DEFAULT_PORT)
        } else {
            ServerIdentity::parse(host_port, DEFAULT_PORT)?
        };

        let encrypted = parse_query_param(query_string, "encrypted")
            .map(|v| parse_bool("encrypted", &v))
            .transpose()?;
        let trust = parse_query_param(query_string, "trust")
            .map(|v| v.parse::<TrustStrategyKind>())
            .transpose()?;

        let mut routing_context = BTreeMap::new();
        for pair in query_string
            .trim_start_matches('?')
            .split('&')
            .filter(|p| !p.is_empty())
        {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid query parameter '{}'", pair))
            })?;
            if key == "encrypted" || key == "trust" {
                continue;
            }
            if !routing {
                return Err(Error::Config(format!(
                    "routing context '{}' is not allowed on a bolt:// URI",
                    key
                )));
            }
            routing_context.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            routing,
            address,
            user,
            password,
            encrypted,
            trust,
            routing_context,
        })
    }

    /// Basic auth token from the URI credentials, if a user was given
    pub fn auth_token(&self) -> Option<AuthToken> {
        self.user.as_ref().map(|user| {
            AuthToken::basic(user.clone(), self.password.clone().unwrap_or_default())
        })
    }
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("routing", &self.routing)
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("encrypted", &self.encrypted)
            .field("trust", &self.trust)
            .field("routing_context", &self.routing_context)
            .finish()
    }
}
