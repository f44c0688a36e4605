//! Server identities and certificate fingerprints

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::net::IpAddr;

/// Address of a Bolt server, used as the key into the known_hosts table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerIdentity {
    /// Hostname or IP literal (without brackets)
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl ServerIdentity {
    /// Create an identity from host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, `[v6]:port`, or a bare host using `default_port`.
    pub fn parse(s: &str, default_port: u16) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Config("empty server address".into()));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| Error::Config(format!("unterminated IPv6 literal in '{}'", s)))?;
            let port = match after.strip_prefix(':') {
                Some(p) => parse_port(p)?,
                None if after.is_empty() => default_port,
                None => return Err(Error::Config(format!("invalid server address '{}'", s))),
            };
            return Ok(Self::new(host, port));
        }

        // A bare IPv6 literal has more than one colon and no port
        if s.parse::<IpAddr>().is_ok() {
            return Ok(Self::new(s, default_port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Ok(Self::new(host, parse_port(port)?)),
            Some(_) => Err(Error::Config(format!("missing host in '{}'", s))),
            None => Ok(Self::new(s, default_port)),
        }
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse()
        .map_err(|_| Error::Config(format!("invalid port '{}'", s)))
}

impl std::fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// SHA-256 of a certificate's DER encoding, exactly as presented by the server.
///
/// The hash is computed over the wire bytes and never over a re-encoded form, so
/// two fingerprints are equal iff the certificates are byte-identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CertificateFingerprint([u8; 32]);

impl CertificateFingerprint {
    const PREFIX: &'static str = "sha256:";

    /// Fingerprint a DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for CertificateFingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for CertificateFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", Self::PREFIX, STANDARD.encode(self.0))
    }
}

impl std::fmt::Debug for CertificateFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CertificateFingerprint({})", self)
    }
}

impl std::str::FromStr for CertificateFingerprint {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let encoded = s.strip_prefix(Self::PREFIX).ok_or_else(|| {
            Error::Config(format!("fingerprint '{}' must start with '{}'", s, Self::PREFIX))
        })?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Config(format!("invalid fingerprint encoding: {}", e)))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Config("fingerprint must be 32 bytes".into()))?;
        Ok(Self(digest))
    }
}
