//! Connect to a Bolt server and print the negotiated security state
//!
//! Run with:
//! ```bash
//! RUST_LOG=bolt_wire=debug cargo run --example tofu_connect -- \
//!     "bolt://localhost:7687" trust-on-first-use
//! ```
//!
//! Credentials come from `BOLT_USER` / `BOLT_PASSWORD` unless embedded in the URI.

use bolt_wire::auth::AuthToken;
use bolt_wire::trust::TrustStrategyKind;
use bolt_wire::{Driver, DriverConfig};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bolt_wire=info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let uri = args
        .next()
        .unwrap_or_else(|| "bolt://localhost:7687".to_string());
    let trust: TrustStrategyKind = args
        .next()
        .as_deref()
        .unwrap_or("trust-on-first-use")
        .parse()?;

    let mut builder = DriverConfig::builder().trust(trust);
    if let Ok(user) = env::var("BOLT_USER") {
        let password = env::var("BOLT_PASSWORD").unwrap_or_default();
        builder = builder.auth(AuthToken::basic(user, password));
    }
    if let Ok(path) = env::var("BOLT_KNOWN_HOSTS") {
        builder = builder.known_hosts_path(path);
    }

    let driver = Driver::new(&uri, builder.build())?;
    println!("trust strategy: {}", driver.trust_strategy().label());
    if let Some(store) = driver.certificate_store() {
        println!("known_hosts:    {}", store.path().display());
    }

    let conn = driver.connect().await?;
    println!("server:         {}", conn.address());
    println!("agent:          {}", conn.server_agent().unwrap_or("<unknown>"));
    println!("secured:        {}", conn.is_secured());
    match conn.peer_fingerprint() {
        Some(fingerprint) => println!("fingerprint:    {}", fingerprint),
        None => println!("fingerprint:    <plain socket>"),
    }

    conn.close().await?;
    Ok(())
}
