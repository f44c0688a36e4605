//! In-process mock Bolt server for integration tests.
//!
//! Speaks just enough Bolt v1 to answer the handshake and one INIT request, over
//! plain TCP or TLS with an rcgen-generated certificate. Every accepted session is
//! reported on a channel once the client hangs up, together with the number of
//! bytes the client sent after the login reply.

#![allow(dead_code)]

use bolt_wire::protocol::constants::signatures;
use bolt_wire::protocol::packstream::{pack, unpack};
use bolt_wire::protocol::{dechunk, write_chunked, Structure, Value};
use bolt_wire::trust::ServerIdentity;
use bytes::BytesMut;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;

pub const SERVER_AGENT: &str = "Neo4j/3.4.0";
pub const USER: &str = "neo4j";
pub const PASSWORD: &str = "password";

/// Certificate and key served by the mock server
#[derive(Clone)]
pub struct ServerCert {
    pub der: CertificateDer<'static>,
    key: Arc<Vec<u8>>,
}

impl ServerCert {
    /// Self-signed certificate for `127.0.0.1` and `localhost`
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec![
            "127.0.0.1".to_string(),
            "localhost".to_string(),
        ])
        .unwrap();
        Self {
            der: certified.cert.der().clone(),
            key: Arc::new(certified.key_pair.serialize_der()),
        }
    }

    fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.as_ref().clone()))
    }

    fn acceptor(&self) -> TlsAcceptor {
        let config = rustls::ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.der.clone()], self.private_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    /// TLS 1.2 acceptor demanding a client certificate.
    ///
    /// The client judges the server certificate and then sends no certificate of
    /// its own, so the server aborts before its Finished: the client never
    /// completes the handshake.
    fn client_auth_acceptor(&self) -> TlsAcceptor {
        let client_ca = rcgen::generate_simple_self_signed(vec!["client-ca".to_string()]).unwrap();
        let mut roots = rustls::RootCertStore::empty();
        roots.add(client_ca.cert.der().clone()).unwrap();
        let client_verifier =
            rustls::server::WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider())
                .build()
                .unwrap();

        let config = rustls::ServerConfig::builder_with_provider(provider())
            .with_protocol_versions(&[&rustls::version::TLS12])
            .unwrap()
            .with_client_cert_verifier(client_verifier)
            .with_single_cert(vec![self.der.clone()], self.private_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }
}

fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

/// How the server treats TLS clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsMode {
    /// Ordinary server authentication
    ServerAuth,
    /// TLS 1.2 with a mandatory client certificate the client cannot supply
    RequireClientCert,
}

/// What the server saw on one accepted connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// The TLS handshake did not complete (client refused the certificate)
    TlsFailed,
    /// Login exchange ran to completion
    LoggedIn {
        /// Session was TLS
        secured: bool,
        /// Credentials matched
        authenticated: bool,
        /// Bytes received after the login reply, until EOF
        trailing_bytes: usize,
    },
    /// Client hung up before sending INIT
    Abandoned {
        /// Session was TLS
        secured: bool,
    },
}

/// Handle to a running mock server
pub struct MockServer {
    pub address: ServerIdentity,
    cert: Arc<Mutex<Option<ServerCert>>>,
    sessions: mpsc::UnboundedReceiver<Session>,
}

impl MockServer {
    /// Plain TCP server
    pub async fn plain() -> Self {
        Self::start(None, TlsMode::ServerAuth).await
    }

    /// TLS server presenting `cert`
    pub async fn tls(cert: ServerCert) -> Self {
        Self::start(Some(cert), TlsMode::ServerAuth).await
    }

    /// TLS server presenting `cert` that fails every handshake after the client
    /// has seen (and accepted) the certificate
    pub async fn tls_requiring_client_cert(cert: ServerCert) -> Self {
        Self::start(Some(cert), TlsMode::RequireClientCert).await
    }

    async fn start(cert: Option<ServerCert>, mode: TlsMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let cert = Arc::new(Mutex::new(cert));
        let (tx, rx) = mpsc::unbounded_channel();

        let accept_cert = cert.clone();
        tokio::spawn(async move {
            loop {
                let Ok((tcp, _)) = listener.accept().await else {
                    return;
                };
                let current = accept_cert.lock().unwrap().clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let session = match current {
                        Some(cert) => {
                            let acceptor = match mode {
                                TlsMode::ServerAuth => cert.acceptor(),
                                TlsMode::RequireClientCert => cert.client_auth_acceptor(),
                            };
                            match acceptor.accept(tcp).await {
                                Ok(tls) => serve(tls, true).await,
                                Err(_) => Session::TlsFailed,
                            }
                        }
                        None => serve(tcp, false).await,
                    };
                    let _ = tx.send(session);
                });
            }
        });

        Self {
            address: ServerIdentity::new("127.0.0.1", port),
            cert,
            sessions: rx,
        }
    }

    /// Present `cert` to every connection accepted from now on
    pub fn rotate_certificate(&self, cert: ServerCert) {
        *self.cert.lock().unwrap() = Some(cert);
    }

    /// `bolt://` URI for this server
    pub fn uri(&self) -> String {
        format!("bolt://{}", self.address)
    }

    /// Wait for the next finished session
    pub async fn next_session(&mut self) -> Session {
        tokio::time::timeout(Duration::from_secs(10), self.sessions.recv())
            .await
            .expect("timed out waiting for a session")
            .expect("server task ended")
    }
}

async fn serve<S>(mut stream: S, secured: bool) -> Session
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = [0u8; 20];
    if stream.read_exact(&mut handshake).await.is_err() {
        return Session::Abandoned { secured };
    }
    assert_eq!(&handshake[0..4], &[0x60, 0x60, 0xB0, 0x17], "bad magic");
    stream.write_all(&[0, 0, 0, 1]).await.unwrap();

    let mut buf = BytesMut::new();
    let payload = loop {
        match dechunk(&buf) {
            Ok((payload, consumed)) => {
                bytes::Buf::advance(&mut buf, consumed);
                break payload;
            }
            Err(_) => {
                if stream.read_buf(&mut buf).await.unwrap_or(0) == 0 {
                    return Session::Abandoned { secured };
                }
            }
        }
    };

    let authenticated = check_init(&payload);
    let reply = if authenticated {
        summary(signatures::SUCCESS, &[("server", SERVER_AGENT)])
    } else {
        summary(
            signatures::FAILURE,
            &[
                ("code", "Neo.ClientError.Security.Unauthorized"),
                (
                    "message",
                    "The client is unauthorized due to authentication failure.",
                ),
            ],
        )
    };
    stream.write_all(&reply).await.unwrap();
    stream.flush().await.unwrap();

    let mut trailing = buf.len();
    let mut scratch = [0u8; 1024];
    loop {
        match stream.read(&mut scratch).await {
            Ok(0) | Err(_) => break,
            Ok(n) => trailing += n,
        }
    }

    Session::LoggedIn {
        secured,
        authenticated,
        trailing_bytes: trailing,
    }
}

/// Whether the INIT message carries the expected basic credentials
fn check_init(payload: &[u8]) -> bool {
    let mut slice = payload;
    let Ok(Value::Structure(Structure { signature, fields })) = unpack(&mut slice) else {
        return false;
    };
    if signature != signatures::INIT {
        return false;
    }
    let Some(Value::Map(token)) = fields.get(1) else {
        return false;
    };
    token.get("scheme").and_then(Value::as_str) == Some("basic")
        && token.get("principal").and_then(Value::as_str) == Some(USER)
        && token.get("credentials").and_then(Value::as_str) == Some(PASSWORD)
}

fn summary(signature: u8, entries: &[(&str, &str)]) -> Vec<u8> {
    let map: BTreeMap<String, Value> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect();
    let mut payload = BytesMut::new();
    pack(
        &Value::Structure(Structure {
            signature,
            fields: vec![Value::Map(map)],
        }),
        &mut payload,
    )
    .unwrap();
    let mut framed = BytesMut::new();
    write_chunked(&payload, &mut framed);
    framed.to_vec()
}
