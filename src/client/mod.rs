//! Driver-level API
//!
//! This module handles:
//! * Connection URI parsing
//! * Driver configuration and its validation
//! * The [`Driver`] handle that opens secured, logged-in connections

mod config;
mod connection_string;
mod driver;
mod validate;

pub use config::{DriverConfig, DriverConfigBuilder, Topology, DEFAULT_USER_AGENT};
pub use connection_string::ConnectionInfo;
pub use driver::Driver;
pub use validate::{effective_trust, validate, ValidatedSecurity};
