//! TLS configuration for secured Bolt connections.
//!
//! Each secured connection gets its own rustls `ClientConfig` whose certificate
//! verifier hands the presented certificate to a [`TrustStrategy`]. The verifier
//! runs inside the handshake, so a rejected certificate aborts it before any
//! application bytes are exchanged.

use crate::trust::{PresentedCertificate, ServerIdentity, TrustDecision, TrustStrategy};
use crate::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::{Arc, Mutex, OnceLock};

/// Crypto provider shared by every verifier and client config in this crate
pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    static PROVIDER: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    PROVIDER
        .get_or_init(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
        .clone()
}

/// Why the verifier refused the handshake, if it did
#[derive(Debug)]
pub(crate) enum VerifierFailure {
    /// The strategy rejected the certificate
    Rejected(String),
    /// The strategy could not reach a decision (known_hosts I/O)
    Errored(Error),
}

/// Per-connection TLS configuration.
///
/// Carries the rustls config plus the slot where the verifier records a refusal,
/// so the establisher can report the real reason instead of rustls' generic alert.
#[derive(Clone)]
pub struct TlsConfig {
    client_config: Arc<ClientConfig>,
    failure: Arc<Mutex<Option<VerifierFailure>>>,
}

impl TlsConfig {
    /// Build a TLS configuration that judges the certificate of `identity` with `strategy`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for [`TrustStrategy::Disabled`], which never negotiates TLS.
    pub fn for_strategy(strategy: &TrustStrategy, identity: &ServerIdentity) -> Result<Self> {
        if !strategy.is_secure() {
            return Err(Error::Config(
                "TLS requested with transport security disabled".into(),
            ));
        }

        let failure = Arc::new(Mutex::new(None));
        let verifier = Arc::new(TrustVerifier {
            strategy: strategy.clone(),
            identity: identity.clone(),
            provider: crypto_provider(),
            failure: failure.clone(),
        });

        let client_config = ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(format!("unsupported protocol versions: {}", e)))?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();

        Ok(Self {
            client_config: Arc::new(client_config),
            failure,
        })
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Take the verifier's recorded refusal, if any
    pub(crate) fn take_failure(&self) -> Option<VerifierFailure> {
        match self.failure.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Certificate verifier delegating the trust decision to a [`TrustStrategy`].
///
/// Handshake signatures are still checked against the provider's algorithms, so
/// the peer must hold the private key of the certificate it presents.
#[derive(Debug)]
struct TrustVerifier {
    strategy: TrustStrategy,
    identity: ServerIdentity,
    provider: Arc<CryptoProvider>,
    failure: Arc<Mutex<Option<VerifierFailure>>>,
}

impl TrustVerifier {
    fn record(&self, failure: VerifierFailure) {
        match self.failure.lock() {
            Ok(mut slot) => *slot = Some(failure),
            Err(poisoned) => *poisoned.into_inner() = Some(failure),
        }
    }
}

impl ServerCertVerifier for TrustVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let presented = PresentedCertificate {
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        };

        match self.strategy.decide(&self.identity, &presented) {
            Ok(TrustDecision::Accept { .. }) => Ok(ServerCertVerified::assertion()),
            Ok(TrustDecision::Reject { reason }) => {
                self.record(VerifierFailure::Rejected(reason));
                Err(rustls::Error::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ))
            }
            Err(e) => {
                self.record(VerifierFailure::Errored(e));
                Err(rustls::Error::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Parse server name from hostname for TLS SNI (Server Name Indication).
///
/// Accepts DNS names (a trailing dot is dropped) and IPv4/IPv6 literals, with or
/// without brackets.
///
/// # Errors
///
/// Returns `Error::Config` if the hostname is neither.
pub fn parse_server_name(hostname: &str) -> Result<ServerName<'static>> {
    let hostname = hostname
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(hostname)
        .trim_end_matches('.');

    if hostname.is_empty() || hostname.len() > 253 {
        return Err(Error::Config(format!(
            "Invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Config(format!("Invalid hostname for TLS: '{}'", hostname)))
}
