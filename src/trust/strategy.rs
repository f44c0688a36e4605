//! Trust strategies: how a presented server certificate is judged

use super::identity::{CertificateFingerprint, ServerIdentity};
use super::store::{CertificateStore, PinOutcome};
use crate::metrics::{counters, labels};
use crate::{Error, Result};
use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::path::PathBuf;
use std::sync::Arc;

/// Trust strategy as selected in configuration.
///
/// Exactly one is selected per driver. [`TrustStrategyKind::Disabled`] means no
/// transport security is attempted at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrustStrategyKind {
    /// Plain TCP, no TLS
    Disabled,
    /// Pin the first certificate seen for each server in the known_hosts table
    TrustOnFirstUse,
    /// Validate against a caller-supplied CA bundle (not available in this build)
    TrustCustomCa(PathBuf),
    /// Validate chain and hostname against the platform trust roots
    #[default]
    TrustSystemCa,
}

impl TrustStrategyKind {
    /// Whether this strategy negotiates TLS
    pub fn is_secure(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl std::fmt::Display for TrustStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::TrustOnFirstUse => write!(f, "trust-on-first-use"),
            Self::TrustCustomCa(path) => write!(f, "trust-custom-ca:{}", path.display()),
            Self::TrustSystemCa => write!(f, "trust-system-ca"),
        }
    }
}

impl std::str::FromStr for TrustStrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "trust-on-first-use" => Ok(Self::TrustOnFirstUse),
            "trust-system-ca" => Ok(Self::TrustSystemCa),
            other => match other.strip_prefix("trust-custom-ca:") {
                Some(path) if !path.is_empty() => Ok(Self::TrustCustomCa(PathBuf::from(path))),
                _ => Err(Error::Config(format!(
                    "invalid trust strategy '{}': expected disabled, trust-on-first-use, \
                     trust-custom-ca:<path>, or trust-system-ca",
                    s
                ))),
            },
        }
    }
}

/// Certificate material presented by the server during the TLS handshake.
///
/// `end_entity` holds the DER bytes exactly as received.
#[derive(Debug)]
pub struct PresentedCertificate<'a> {
    /// Server's leaf certificate
    pub end_entity: &'a CertificateDer<'a>,
    /// Intermediates sent alongside the leaf
    pub intermediates: &'a [CertificateDer<'a>],
    /// Name the client asked for (SNI)
    pub server_name: &'a ServerName<'a>,
    /// Stapled OCSP response, possibly empty
    pub ocsp_response: &'a [u8],
    /// Verification time
    pub now: UnixTime,
}

impl PresentedCertificate<'_> {
    /// Fingerprint of the leaf certificate
    pub fn fingerprint(&self) -> CertificateFingerprint {
        CertificateFingerprint::from_der(self.end_entity.as_ref())
    }
}

/// Outcome of [`TrustStrategy::decide`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// Certificate trusted
    Accept {
        /// Fingerprint of the accepted certificate
        fingerprint: CertificateFingerprint,
    },
    /// Certificate not trusted
    Reject {
        /// Human-readable reason
        reason: String,
    },
}

/// Resolved trust strategy, ready to judge certificates.
///
/// Built from a [`TrustStrategyKind`] by the driver's configuration validator.
/// There is no custom-CA variant: that kind never resolves.
#[derive(Debug, Clone)]
pub enum TrustStrategy {
    /// Plain TCP, no certificate is ever judged
    Disabled,
    /// Check-and-pin against the given store
    TrustOnFirstUse(Arc<CertificateStore>),
    /// WebPKI chain and hostname validation
    TrustSystemCa(Arc<WebPkiServerVerifier>),
}

impl TrustStrategy {
    /// Trust-on-first-use backed by `store`
    pub fn trust_on_first_use(store: Arc<CertificateStore>) -> Self {
        Self::TrustOnFirstUse(store)
    }

    /// Platform trust roots, falling back to the bundled Mozilla roots when the
    /// platform store yields nothing.
    pub fn system_ca() -> Result<Self> {
        let result = rustls_native_certs::load_native_certs();

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(result.certs);
        if !result.errors.is_empty() {
            tracing::debug!(
                errors = result.errors.len(),
                "some platform root certificates could not be loaded"
            );
        }
        if ignored > 0 {
            tracing::debug!(ignored, "skipped unparsable platform root certificates");
        }

        if added == 0 {
            tracing::warn!("no platform root certificates found, using bundled webpki roots");
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }

        Self::with_roots(roots)
    }

    /// WebPKI validation against an explicit set of roots
    pub(crate) fn with_roots(roots: RootCertStore) -> Result<Self> {
        let verifier = WebPkiServerVerifier::builder_with_provider(
            Arc::new(roots),
            crate::connection::crypto_provider(),
        )
        .build()
        .map_err(|e| Error::Config(format!("failed to build certificate verifier: {}", e)))?;
        Ok(Self::TrustSystemCa(verifier))
    }

    /// Whether this strategy negotiates TLS
    pub fn is_secure(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => labels::STRATEGY_DISABLED,
            Self::TrustOnFirstUse(_) => labels::STRATEGY_TOFU,
            Self::TrustSystemCa(_) => labels::STRATEGY_SYSTEM_CA,
        }
    }

    /// Judge the certificate `presented` by the server at `identity`.
    ///
    /// Runs inside the TLS handshake, before the server has proven it holds the
    /// certificate's key, so nothing is written here. Under trust-on-first-use an
    /// unknown server is accepted provisionally; [`TrustStrategy::confirm`] pins it
    /// once the handshake completes.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; an untrusted certificate is
    /// [`TrustDecision::Reject`].
    pub fn decide(
        &self,
        identity: &ServerIdentity,
        presented: &PresentedCertificate<'_>,
    ) -> Result<TrustDecision> {
        let decision = match self {
            Self::Disabled => TrustDecision::Reject {
                reason: "transport security is disabled for this driver".into(),
            },
            Self::TrustOnFirstUse(store) => decide_first_use(store, identity, presented)?,
            Self::TrustSystemCa(verifier) => decide_system_ca(verifier, presented),
        };

        match &decision {
            TrustDecision::Accept { .. } => {
                counters::trust_decision(self.label(), labels::DECISION_ACCEPT)
            }
            TrustDecision::Reject { reason } => {
                tracing::warn!(server = %identity, strategy = self.label(), %reason, "server certificate rejected");
                counters::trust_decision(self.label(), labels::DECISION_REJECT)
            }
        }

        Ok(decision)
    }

    /// Make the trust decision for a completed handshake durable.
    ///
    /// Under trust-on-first-use this is the atomic check-and-pin: the first
    /// certificate seen for `identity` is written and fsynced before this returns,
    /// and a certificate pinned concurrently by another connection wins. The other
    /// strategies have nothing to persist and accept.
    ///
    /// Blocks on the store's file lock; async callers run it on a blocking thread.
    ///
    /// # Errors
    ///
    /// Only store failures are errors.
    pub fn confirm(
        &self,
        identity: &ServerIdentity,
        fingerprint: &CertificateFingerprint,
    ) -> Result<TrustDecision> {
        let Self::TrustOnFirstUse(store) = self else {
            return Ok(TrustDecision::Accept {
                fingerprint: *fingerprint,
            });
        };

        match store.pin(identity, fingerprint)? {
            PinOutcome::Pinned => {
                tracing::info!(server = %identity, %fingerprint, "pinned server certificate on first use");
                Ok(TrustDecision::Accept {
                    fingerprint: *fingerprint,
                })
            }
            PinOutcome::Matched => Ok(TrustDecision::Accept {
                fingerprint: *fingerprint,
            }),
            PinOutcome::Mismatch { pinned } => {
                let reason = changed_since_first_use(store, &pinned, fingerprint);
                tracing::warn!(server = %identity, strategy = self.label(), %reason, "server certificate rejected");
                counters::trust_decision(self.label(), labels::DECISION_REJECT);
                Ok(TrustDecision::Reject { reason })
            }
        }
    }
}

fn decide_first_use(
    store: &CertificateStore,
    identity: &ServerIdentity,
    presented: &PresentedCertificate<'_>,
) -> Result<TrustDecision> {
    let fingerprint = presented.fingerprint();

    match store.get(identity)? {
        None => {
            tracing::debug!(server = %identity, %fingerprint, "no pinned certificate, accepting provisionally");
            Ok(TrustDecision::Accept { fingerprint })
        }
        Some(pinned) if pinned == fingerprint => {
            tracing::debug!(server = %identity, "server certificate matches pinned fingerprint");
            Ok(TrustDecision::Accept { fingerprint })
        }
        Some(pinned) => Ok(TrustDecision::Reject {
            reason: changed_since_first_use(store, &pinned, &fingerprint),
        }),
    }
}

fn changed_since_first_use(
    store: &CertificateStore,
    pinned: &CertificateFingerprint,
    presented: &CertificateFingerprint,
) -> String {
    format!(
        "certificate changed since first use (pinned {}, presented {}); \
         remove the entry from {} to trust the new certificate",
        pinned,
        presented,
        store.path().display()
    )
}

fn decide_system_ca(
    verifier: &WebPkiServerVerifier,
    presented: &PresentedCertificate<'_>,
) -> TrustDecision {
    match verifier.verify_server_cert(
        presented.end_entity,
        presented.intermediates,
        presented.server_name,
        presented.ocsp_response,
        presented.now,
    ) {
        Ok(_) => TrustDecision::Accept {
            fingerprint: presented.fingerprint(),
        },
        Err(e) => TrustDecision::Reject {
            reason: format!("certificate validation failed: {}", e),
        },
    }
}
