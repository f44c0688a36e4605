//! Secure channel establishment

use super::conn::Connection;
use super::tls::TlsConfig;
use super::transport::Transport;
use crate::metrics::{counters, histograms};
use crate::trust::{ServerIdentity, TrustDecision, TrustStrategy};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Open a connection to `address`, secured according to `strategy`.
///
/// With [`TrustStrategy::Disabled`] the raw TCP socket is used. Otherwise the
/// socket is upgraded to TLS and the presented certificate is judged by the
/// strategy during the handshake. A rejected certificate closes the socket; the
/// connection is never retried in plaintext.
///
/// Only once the handshake has completed, proving the server holds the
/// certificate's key, is a trust-on-first-use pin written. The pin is durable
/// before this returns.
///
/// `timeout` bounds the TCP connect and TLS handshake together.
///
/// # Errors
///
/// * `Error::Io` / `Error::ConnectTimeout` for transport failures
/// * `Error::TrustRejected` if the certificate is not trusted
/// * `Error::Store` if the known_hosts table could not be read or written
/// * `Error::Tls` for other handshake failures
pub async fn establish(
    address: &ServerIdentity,
    strategy: &TrustStrategy,
    timeout: Option<Duration>,
) -> Result<Connection> {
    async {
        let start = Instant::now();

        let handshake = match timeout {
            Some(limit) => tokio::time::timeout(limit, open(address, strategy))
                .await
                .unwrap_or_else(|_| Err(Error::ConnectTimeout(limit))),
            None => open(address, strategy).await,
        };
        let result = match handshake {
            Ok(transport) => confirm(address, strategy, transport).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(transport) => {
                let secured = transport.is_secured();
                histograms::handshake_duration(secured, start.elapsed().as_millis() as u64);
                counters::connection_established(secured);

                let conn = Connection::new(transport, address.clone());
                match conn.peer_fingerprint() {
                    Some(fingerprint) => {
                        tracing::info!(%fingerprint, "secured connection established")
                    }
                    None => tracing::info!("plain connection established"),
                }
                Ok(conn)
            }
            Err(e) => {
                counters::connection_error(e.category());
                tracing::debug!(error = %e, "connection establishment failed");
                Err(e)
            }
        }
    }
    .instrument(tracing::info_span!(
        "establish",
        server = %address,
        strategy = strategy.label()
    ))
    .await
}

async fn open(address: &ServerIdentity, strategy: &TrustStrategy) -> Result<Transport> {
    let transport = Transport::connect_tcp(&address.host, address.port).await?;
    tracing::debug!("tcp connection open");

    if !strategy.is_secure() {
        return Ok(transport);
    }

    let tls = TlsConfig::for_strategy(strategy, address)?;
    transport.upgrade_to_tls(&tls, address).await
}

/// Persist the trust decision for a completed handshake, dropping the socket if
/// the certificate lost to one pinned meanwhile by another connection.
async fn confirm(
    address: &ServerIdentity,
    strategy: &TrustStrategy,
    transport: Transport,
) -> Result<Transport> {
    if !matches!(strategy, TrustStrategy::TrustOnFirstUse(_)) {
        return Ok(transport);
    }

    let fingerprint = transport
        .peer_fingerprint()
        .ok_or_else(|| Error::Tls("server presented no certificate".into()))?;

    let decision = {
        let strategy = strategy.clone();
        let identity = address.clone();
        tokio::task::spawn_blocking(move || strategy.confirm(&identity, &fingerprint))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??
    };

    match decision {
        TrustDecision::Accept { .. } => Ok(transport),
        TrustDecision::Reject { reason } => Err(Error::TrustRejected {
            identity: address.clone(),
            reason,
        }),
    }
}
