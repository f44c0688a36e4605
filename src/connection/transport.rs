//! Transport abstraction (plain TCP vs TLS over TCP)

use super::tls::{parse_server_name, TlsConfig, VerifierFailure};
use crate::trust::{CertificateFingerprint, ServerIdentity};
use crate::{Error, Result};
use bytes::BytesMut;
use rustls_pki_types::CertificateDer;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Transport layer abstraction
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP connection
    Plain(TcpStream),
    /// TLS-encrypted TCP connection
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain(TcpStream)"),
            Transport::Tls(_) => f.write_str("Transport::Tls(TlsStream)"),
        }
    }
}

impl Transport {
    /// Connect via plain TCP
    pub async fn connect_tcp(host: &str, port: u16) -> Result<Self> {
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Transport::Plain(stream))
    }

    /// Upgrade a plain TCP transport to TLS.
    ///
    /// The certificate presented by `identity` is judged by the verifier inside
    /// `tls_config`. On any failure the TCP socket is dropped, never reused in
    /// plaintext.
    ///
    /// # Errors
    ///
    /// * `Error::TrustRejected` if the certificate is not trusted
    /// * `Error::Store` if the known_hosts table could not be consulted
    /// * `Error::Tls` for other handshake failures
    /// * `Error::Io` if the socket failed underneath the handshake
    pub async fn upgrade_to_tls(
        self,
        tls_config: &TlsConfig,
        identity: &ServerIdentity,
    ) -> Result<Self> {
        match self {
            Transport::Plain(tcp_stream) => {
                let server_name = parse_server_name(&identity.host)?;

                let tls_connector = tokio_rustls::TlsConnector::from(tls_config.client_config());
                let tls_stream = tls_connector
                    .connect(server_name, tcp_stream)
                    .await
                    .map_err(|e| classify_handshake_error(e, tls_config, identity))?;

                Ok(Transport::Tls(tls_stream))
            }
            Transport::Tls(_) => Err(Error::Config(
                "transport is already TLS-encrypted".into(),
            )),
        }
    }

    /// Whether the transport is TLS-encrypted
    pub fn is_secured(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// DER bytes of the server's end-entity certificate, as presented.
    ///
    /// Returns `None` for plain TCP connections.
    pub fn peer_certificate(&self) -> Option<CertificateDer<'static>> {
        match self {
            Transport::Plain(_) => None,
            Transport::Tls(stream) => {
                let (_tcp, conn) = stream.get_ref();
                conn.peer_certificates()?.first().cloned()
            }
        }
    }

    /// SHA-256 fingerprint of [`Transport::peer_certificate`]
    pub fn peer_fingerprint(&self) -> Option<CertificateFingerprint> {
        self.peer_certificate()
            .map(|cert| CertificateFingerprint::from_der(cert.as_ref()))
    }

    /// Write all bytes to the transport
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.write_all(buf).await?,
            Transport::Tls(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    /// Flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush().await?,
            Transport::Tls(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Read bytes into buffer
    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Transport::Plain(stream) => stream.read_buf(buf).await?,
            Transport::Tls(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }

    /// Read exactly `buf.len()` bytes
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = match self {
            Transport::Plain(stream) => stream.read_exact(buf).await,
            Transport::Tls(stream) => stream.read_exact(buf).await,
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
            Err(e) => Err(e.into()),
        }
    }

    /// Shutdown the transport
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Transport::Plain(stream) => stream.shutdown().await?,
            Transport::Tls(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}

/// Map a failed TLS handshake to the error the caller should see.
///
/// A refusal recorded by our verifier wins; tokio-rustls otherwise reports rustls
/// errors wrapped in `io::ErrorKind::InvalidData`.
fn classify_handshake_error(
    err: io::Error,
    tls_config: &TlsConfig,
    identity: &ServerIdentity,
) -> Error {
    match tls_config.take_failure() {
        Some(VerifierFailure::Rejected(reason)) => {
            return Error::TrustRejected {
                identity: identity.clone(),
                reason,
            }
        }
        Some(VerifierFailure::Errored(e)) => return e,
        None => {}
    }

    let tls_error = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .cloned();

    match tls_error {
        Some(rustls::Error::InvalidCertificate(cert_err)) => Error::TrustRejected {
            identity: identity.clone(),
            reason: format!("invalid certificate: {:?}", cert_err),
        },
        Some(other) => Error::Tls(format!("TLS handshake failed: {}", other)),
        None => Error::Io(err),
    }
}
