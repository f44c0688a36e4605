//! bolt-wire: connection security for Bolt clients
//!
//! This crate decides, per physical connection, whether a Bolt socket is plain or
//! TLS-secured, how the server's certificate is trusted, and how the server's answer
//! to the login exchange is surfaced to the caller.
//!
//! * [`client::Driver`] validates configuration once and establishes connections
//! * [`connection`] opens sockets, runs the TLS handshake and the Bolt handshake
//! * [`trust`] holds the trust strategies and the persisted known_hosts table
//! * [`auth`] maps the server's INIT response to a typed [`auth::AuthOutcome`]
//!
//! Query execution, pooling and routing discovery live outside this crate; they
//! consume [`connection::Connection`] and its security state.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> bolt_wire::Result<()> {
//! use bolt_wire::client::{Driver, DriverConfig};
//! use bolt_wire::auth::AuthToken;
//! use bolt_wire::trust::TrustStrategyKind;
//!
//! let config = DriverConfig::builder()
//!     .trust(TrustStrategyKind::TrustOnFirstUse)
//!     .auth(AuthToken::basic("neo4j", "secret"))
//!     .build();
//!
//! let driver = Driver::new("bolt://db.example.com:7687", config)?;
//! let connection = driver.connect().await?;
//! assert!(connection.is_secured());
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod trust;

pub use client::{Driver, DriverConfig};
pub use error::{Error, ErrorKind, Result};
