//! Connection management
//!
//! This module handles:
//! * Transport abstraction (plain TCP vs TLS)
//! * Secure channel establishment under a trust strategy
//! * Connection lifecycle (handshake, login)
//! * State machine enforcement

mod conn;
mod establish;
mod security;
mod state;
mod tls;
mod transport;

pub use conn::Connection;
pub use establish::establish;
pub use security::ConnectionSecurityState;
pub use state::ConnectionState;
pub(crate) use tls::crypto_provider;
pub use tls::{parse_server_name, TlsConfig};
pub use transport::Transport;
