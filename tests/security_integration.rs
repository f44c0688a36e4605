//! End-to-end connection security tests against an in-process mock Bolt server.
//!
//! Each test gets its own temp-dir known_hosts table, so tests run in parallel
//! without sharing trust state.

mod common;

use bolt_wire::auth::AuthToken;
use bolt_wire::client::Topology;
use bolt_wire::trust::{CertificateFingerprint, CertificateStore, ServerIdentity, TrustStrategyKind};
use bolt_wire::{Driver, DriverConfig, Error, ErrorKind};
use common::{MockServer, ServerCert, Session, PASSWORD, SERVER_AGENT, USER};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn known_hosts(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("neo4j").join("known_hosts")
}

fn tofu_config(path: &Path) -> DriverConfig {
    DriverConfig::builder()
        .trust(TrustStrategyKind::TrustOnFirstUse)
        .known_hosts_path(path)
        .auth(AuthToken::basic(USER, PASSWORD))
        .build()
}

fn fingerprint(cert: &ServerCert) -> CertificateFingerprint {
    CertificateFingerprint::from_der(cert.der.as_ref())
}

#[tokio::test]
async fn test_tofu_first_connection_pins_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let cert = ServerCert::generate();
    let mut server = MockServer::tls(cert.clone()).await;

    let driver = Driver::new(&server.uri(), tofu_config(&path)).unwrap();
    let conn = driver.connect().await.unwrap();

    assert!(conn.is_secured());
    assert_eq!(conn.peer_fingerprint(), Some(&fingerprint(&cert)));
    assert_eq!(conn.peer_certificate(), Some(&cert.der));
    assert_eq!(conn.server_agent(), Some(SERVER_AGENT));

    let records = CertificateStore::open(&path).records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity, server.address);
    assert_eq!(records[0].fingerprint, fingerprint(&cert));

    conn.close().await.unwrap();
    assert_eq!(
        server.next_session().await,
        Session::LoggedIn {
            secured: true,
            authenticated: true,
            trailing_bytes: 0
        }
    );
}

#[tokio::test]
async fn test_tofu_same_certificate_is_trusted_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let cert = ServerCert::generate();
    let server = MockServer::tls(cert.clone()).await;

    let driver = Driver::new(&server.uri(), tofu_config(&path)).unwrap();
    let first = driver.connect().await.unwrap();
    let pinned = first.peer_certificate().cloned();
    first.close().await.unwrap();

    let before = std::fs::read(&path).unwrap();

    let second = driver.connect().await.unwrap();
    assert_eq!(second.peer_certificate().cloned(), pinned);
    second.close().await.unwrap();

    // A matching certificate leaves the table untouched
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(
        CertificateStore::open(&path).get(&server.address).unwrap(),
        Some(fingerprint(&cert))
    );
}

#[tokio::test]
async fn test_tofu_changed_certificate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let original = ServerCert::generate();
    let mut server = MockServer::tls(original.clone()).await;

    let driver = Driver::new(&server.uri(), tofu_config(&path)).unwrap();
    driver.connect().await.unwrap().close().await.unwrap();
    server.next_session().await;

    server.rotate_certificate(ServerCert::generate());
    let err = driver.connect().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TrustRejected);
    match err {
        Error::TrustRejected { identity, reason } => {
            assert_eq!(identity, server.address);
            assert!(reason.contains("certificate changed since first use"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // No silent re-pin, and the handshake never completed
    assert_eq!(
        CertificateStore::open(&path).get(&server.address).unwrap(),
        Some(fingerprint(&original))
    );
    assert_eq!(server.next_session().await, Session::TlsFailed);
}

#[tokio::test]
async fn test_repin_after_store_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let first_cert = ServerCert::generate();
    let second_cert = ServerCert::generate();
    let server = MockServer::tls(first_cert.clone()).await;

    let driver = Driver::new(&server.uri(), tofu_config(&path)).unwrap();
    driver.connect().await.unwrap().close().await.unwrap();
    assert_eq!(
        CertificateStore::open(&path).get(&server.address).unwrap(),
        Some(fingerprint(&first_cert))
    );

    std::fs::remove_file(&path).unwrap();
    server.rotate_certificate(second_cert.clone());

    let conn = driver.connect().await.unwrap();
    assert_eq!(conn.peer_fingerprint(), Some(&fingerprint(&second_cert)));
    conn.close().await.unwrap();

    let records = CertificateStore::open(&path).records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fingerprint, fingerprint(&second_cert));
}

#[tokio::test]
async fn test_concurrent_first_connections_pin_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let cert = ServerCert::generate();
    let server = MockServer::tls(cert.clone()).await;

    let driver = Driver::new(&server.uri(), tofu_config(&path)).unwrap();
    let attempts = (0..8).map(|_| {
        let driver = driver.clone();
        tokio::spawn(async move { driver.connect().await })
    });

    for result in futures::future::join_all(attempts).await {
        let conn = result.unwrap().unwrap();
        assert_eq!(conn.peer_fingerprint(), Some(&fingerprint(&cert)));
        conn.close().await.unwrap();
    }

    let records = CertificateStore::open(&path).records().unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_tofu_with_routing_fails_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);

    for uri in ["bolt+routing://127.0.0.1:7687", "neo4j://127.0.0.1:7687"] {
        let err = Driver::new(uri, tofu_config(&path)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    let err = Driver::with_topology(
        Topology::Routing(vec![
            ServerIdentity::new("core1", 7687),
            ServerIdentity::new("core2", 7687),
        ]),
        tofu_config(&path),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    assert!(!path.exists());
}

#[tokio::test]
async fn test_custom_ca_not_implemented() {
    let mut server = MockServer::plain().await;
    let config = DriverConfig::builder()
        .trust(TrustStrategyKind::TrustCustomCa("/etc/neo4j/ca.pem".into()))
        .build();

    let err = Driver::new(&server.uri(), config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    // Nothing ever dialed the server
    let idle = tokio::time::timeout(std::time::Duration::from_millis(200), server.next_session());
    assert!(idle.await.is_err());
}

#[tokio::test]
async fn test_unencrypted_uses_plain_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let mut server = MockServer::plain().await;

    let mut config = tofu_config(&path);
    config.encrypted = false;

    let driver = Driver::new(&server.uri(), config).unwrap();
    let conn = driver.connect().await.unwrap();
    assert!(!conn.is_secured());
    assert!(conn.peer_fingerprint().is_none());
    assert!(conn.peer_certificate().is_none());
    assert!(driver.certificate_store().is_none());
    conn.close().await.unwrap();

    assert_eq!(
        server.next_session().await,
        Session::LoggedIn {
            secured: false,
            authenticated: true,
            trailing_bytes: 0
        }
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn test_encrypted_query_param_disables_tls() {
    let server = MockServer::plain().await;
    let uri = format!("{}?encrypted=false", server.uri());
    let config = DriverConfig::builder()
        .auth(AuthToken::basic(USER, PASSWORD))
        .build();

    let conn = Driver::new(&uri, config).unwrap().connect().await.unwrap();
    assert!(!conn.is_secured());
}

#[tokio::test]
async fn test_wrong_password_closes_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let mut server = MockServer::tls(ServerCert::generate()).await;

    let config = DriverConfig::builder()
        .trust(TrustStrategyKind::TrustOnFirstUse)
        .known_hosts_path(&path)
        .auth(AuthToken::basic(USER, "wrong-password"))
        .build();

    let err = Driver::new(&server.uri(), config)
        .unwrap()
        .connect()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationRejected);
    match err {
        Error::Authentication { code, .. } => {
            assert_eq!(code.as_deref(), Some("Neo.ClientError.Security.Unauthorized"))
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(
        server.next_session().await,
        Session::LoggedIn {
            secured: true,
            authenticated: false,
            trailing_bytes: 0
        }
    );
}

#[tokio::test]
async fn test_uri_credentials_authenticate() {
    let server = MockServer::plain().await;
    let uri = format!(
        "bolt://{}:{}@{}?encrypted=false",
        USER, PASSWORD, server.address
    );

    let conn = Driver::new(&uri, DriverConfig::default())
        .unwrap()
        .connect()
        .await
        .unwrap();
    assert_eq!(conn.server_agent(), Some(SERVER_AGENT));
}

#[tokio::test]
async fn test_system_ca_rejects_self_signed() {
    let mut server = MockServer::tls(ServerCert::generate()).await;
    let config = DriverConfig::builder()
        .auth(AuthToken::basic(USER, PASSWORD))
        .build();

    let err = Driver::new(&server.uri(), config)
        .unwrap()
        .connect()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TrustRejected);
    // Never downgraded to a plaintext login
    assert_eq!(server.next_session().await, Session::TlsFailed);
}

#[tokio::test]
async fn test_corrupt_store_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{ not json").unwrap();

    let mut server = MockServer::tls(ServerCert::generate()).await;
    let err = Driver::new(&server.uri(), tofu_config(&path))
        .unwrap()
        .connect()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(server.next_session().await, Session::TlsFailed);
    assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let driver = Driver::new(&format!("bolt://127.0.0.1:{}", port), tofu_config(&path)).unwrap();

    let err = driver.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retriable());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_incomplete_handshake_does_not_pin() {
    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let mut server = MockServer::tls_requiring_client_cert(ServerCert::generate()).await;

    let err = Driver::new(&server.uri(), tofu_config(&path))
        .unwrap()
        .connect()
        .await
        .unwrap_err();

    // The server saw no client certificate and aborted before Finished
    assert_ne!(err.kind(), ErrorKind::TrustRejected);
    assert_ne!(err.kind(), ErrorKind::Store);
    assert_eq!(server.next_session().await, Session::TlsFailed);

    // A certificate no handshake completed with is never remembered
    assert!(!path.exists());
    assert_eq!(CertificateStore::open(&path).get(&server.address).unwrap(), None);
}

#[tokio::test]
async fn test_connect_timeout_is_transport_error() {
    // Accepts TCP but never answers the TLS ClientHello
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let path = known_hosts(&dir);
    let config = DriverConfig::builder()
        .trust(TrustStrategyKind::TrustOnFirstUse)
        .known_hosts_path(&path)
        .connect_timeout(Duration::from_millis(200))
        .auth(AuthToken::basic(USER, PASSWORD))
        .build();

    let driver = Driver::new(&format!("bolt://127.0.0.1:{}", port), config).unwrap();
    let err = tokio::time::timeout(Duration::from_secs(10), driver.connect())
        .await
        .expect("connect_timeout not enforced")
        .unwrap_err();

    assert!(matches!(err, Error::ConnectTimeout(limit) if limit == Duration::from_millis(200)));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retriable());
    assert!(!path.exists());
}
