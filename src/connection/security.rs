//! Security state of an established connection

use crate::trust::CertificateFingerprint;

/// Whether a connection is secured, and by which certificate.
///
/// Only constructible through [`ConnectionSecurityState::plain`] and
/// [`ConnectionSecurityState::secured`], so a fingerprint is present exactly when
/// the connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSecurityState {
    peer_fingerprint: Option<CertificateFingerprint>,
}

impl ConnectionSecurityState {
    /// Plain TCP, no certificate
    pub fn plain() -> Self {
        Self {
            peer_fingerprint: None,
        }
    }

    /// TLS with the given peer certificate fingerprint
    pub fn secured(fingerprint: CertificateFingerprint) -> Self {
        Self {
            peer_fingerprint: Some(fingerprint),
        }
    }

    /// Whether TLS is in use
    pub fn is_secured(&self) -> bool {
        self.peer_fingerprint.is_some()
    }

    /// Fingerprint of the server certificate, `None` on plain connections
    pub fn peer_fingerprint(&self) -> Option<&CertificateFingerprint> {
        self.peer_fingerprint.as_ref()
    }
}
