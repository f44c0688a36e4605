//! Core connection type

use super::security::ConnectionSecurityState;
use super::state::ConnectionState;
use super::transport::Transport;
use crate::auth::{map_init_response, AuthOutcome, AuthToken};
use crate::metrics::{counters, histograms, labels};
use crate::protocol::constants::{HTTP_SIGNATURE, NO_VERSION, PROPOSED_VERSIONS};
use crate::protocol::{
    decode_message, decode_version, encode_handshake, encode_message, BackendMessage,
    FrontendMessage,
};
use crate::trust::{CertificateFingerprint, ServerIdentity};
use crate::{Error, Result};
use bytes::{Buf, BytesMut};
use rustls_pki_types::CertificateDer;
use std::io;
use tracing::Instrument;

/// Bolt connection
///
/// Owns the socket (plain or TLS) once the establisher hands it over. The security
/// state is fixed at construction and never changes afterwards.
pub struct Connection {
    transport: Option<Transport>,
    state: ConnectionState,
    read_buf: BytesMut,
    address: ServerIdentity,
    security: ConnectionSecurityState,
    peer_certificate: Option<CertificateDer<'static>>,
    protocol_version: Option<u32>,
    server_agent: Option<String>,
}

impl Connection {
    /// Create connection from an established transport
    pub fn new(transport: Transport, address: ServerIdentity) -> Self {
        let peer_certificate = transport.peer_certificate();
        let security = match (&transport, &peer_certificate) {
            (Transport::Tls(_), Some(cert)) => {
                ConnectionSecurityState::secured(CertificateFingerprint::from_der(cert.as_ref()))
            }
            _ => ConnectionSecurityState::plain(),
        };

        Self {
            transport: Some(transport),
            state: ConnectionState::Initial,
            read_buf: BytesMut::with_capacity(8192),
            address,
            security,
            peer_certificate,
            protocol_version: None,
            server_agent: None,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Server this connection was opened to
    pub fn address(&self) -> &ServerIdentity {
        &self.address
    }

    /// Security state fixed at establishment
    pub fn security(&self) -> ConnectionSecurityState {
        self.security
    }

    /// Whether the socket is TLS-encrypted
    pub fn is_secured(&self) -> bool {
        self.security.is_secured()
    }

    /// Fingerprint of the server certificate, `None` on plain connections
    pub fn peer_fingerprint(&self) -> Option<&CertificateFingerprint> {
        self.security.peer_fingerprint()
    }

    /// DER bytes of the server certificate as presented, `None` on plain connections
    pub fn peer_certificate(&self) -> Option<&CertificateDer<'static>> {
        self.peer_certificate.as_ref()
    }

    /// Negotiated Bolt version, once the handshake has completed
    pub fn protocol_version(&self) -> Option<u32> {
        self.protocol_version
    }

    /// Server agent reported on login, e.g. `Neo4j/3.4.0`
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Borrow the underlying socket, for the layers that run queries over it
    pub fn transport_mut(&mut self) -> Result<&mut Transport> {
        self.transport.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Give up the connection and take the socket
    pub fn into_transport(mut self) -> Option<Transport> {
        self.transport.take()
    }

    /// Perform the Bolt handshake and log in.
    ///
    /// # Errors
    ///
    /// * `Error::Authentication` if the server refused the credentials; the socket
    ///   is closed before this returns
    /// * `Error::Protocol` if no version could be agreed, or the server answered
    ///   INIT out of protocol
    pub async fn startup(&mut self, user_agent: &str, auth: &AuthToken) -> Result<()> {
        let address = self.address.clone();
        let secured = self.security.is_secured();
        async {
            let start = std::time::Instant::now();

            self.negotiate_version().await?;

            self.state.transition(ConnectionState::Authenticating)?;
            let outcome = self.authenticate(user_agent, auth).await?;
            histograms::auth_duration(auth.scheme(), start.elapsed().as_millis() as u64);

            match outcome {
                AuthOutcome::Authenticated { server } => {
                    counters::auth_successful(auth.scheme());
                    self.server_agent = server;
                    self.state.transition(ConnectionState::Ready)?;
                    tracing::info!(server_agent = ?self.server_agent, "startup complete");
                    Ok(())
                }
                failed => {
                    let reason = match failed {
                        AuthOutcome::Rejected { .. } => labels::AUTH_REJECTED,
                        _ => labels::AUTH_PROTOCOL_ERROR,
                    };
                    counters::auth_failed(auth.scheme(), reason);
                    counters::connection_error(reason);
                    tracing::warn!(?failed, "login failed, closing connection");

                    self.shutdown_transport().await;
                    Err(failed
                        .into_error()
                        .unwrap_or_else(|| Error::Protocol("login failed".into())))
                }
            }
        }
        .instrument(tracing::info_span!(
            "startup",
            server = %address,
            secured,
            scheme = auth.scheme()
        ))
        .await
    }

    /// Send the handshake and check the server's version choice
    async fn negotiate_version(&mut self) -> Result<()> {
        self.state.transition(ConnectionState::Handshaking)?;

        let handshake = encode_handshake();
        let transport = self.transport_mut()?;
        transport.write_all(&handshake).await?;
        transport.flush().await?;

        let mut reply = [0u8; 4];
        transport.read_exact(&mut reply).await?;
        let version = decode_version(reply);

        match version {
            HTTP_SIGNATURE => Err(Error::Protocol(
                "server responded HTTP; make sure you are not connecting to the HTTP port \
                 (Bolt defaults to 7687, HTTP to 7474)"
                    .into(),
            )),
            NO_VERSION => Err(Error::Protocol(
                "server does not support any of the proposed protocol versions".into(),
            )),
            v if PROPOSED_VERSIONS.contains(&v) => {
                tracing::debug!(version = v, "protocol version negotiated");
                self.protocol_version = Some(v);
                Ok(())
            }
            other => Err(Error::Protocol(format!(
                "server chose protocol version {} which was not proposed",
                other
            ))),
        }
    }

    /// Send INIT and map the reply
    async fn authenticate(&mut self, user_agent: &str, auth: &AuthToken) -> Result<AuthOutcome> {
        counters::auth_attempted(auth.scheme());

        let init = FrontendMessage::Init {
            user_agent: user_agent.to_string(),
            auth_token: auth.to_map(),
        };
        tracing::debug!(?init, "sending INIT");
        self.send_message(&init).await?;

        let response = match self.receive_message().await {
            Ok(msg) => Some(msg),
            Err(Error::ConnectionClosed) => None,
            Err(Error::Io(e)) if is_disconnect(&e) => None,
            Err(e) => return Err(e),
        };

        Ok(map_init_response(response))
    }

    /// Send a frontend message
    async fn send_message(&mut self, msg: &FrontendMessage) -> Result<()> {
        let buf = encode_message(msg)?;
        let transport = self.transport_mut()?;
        transport.write_all(&buf).await?;
        transport.flush().await?;
        Ok(())
    }

    /// Receive a backend message
    async fn receive_message(&mut self) -> Result<BackendMessage> {
        loop {
            match decode_message(&mut self.read_buf) {
                Ok((msg, consumed)) => {
                    self.read_buf.advance(consumed);
                    return Ok(msg);
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                Err(e) => return Err(Error::Protocol(e.to_string())),
            }

            // Need more data
            let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Shut the socket down and release it, ignoring errors
    async fn shutdown_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown().await {
                tracing::debug!(error = %e, "error shutting down transport");
            }
        }
        self.state = ConnectionState::Closed;
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.state.transition(ConnectionState::Closed)?;
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("security", &self.security)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}
