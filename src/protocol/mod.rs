//! Bolt wire protocol
//!
//! This module implements the subset of Bolt v1 needed to bring a connection up:
//! * Handshake (magic preamble and version negotiation)
//! * Chunked message framing
//! * PackStream value encoding
//! * INIT request and summary responses

pub mod constants;
pub mod decode;
pub mod encode;
pub mod message;
pub mod packstream;

pub use decode::{dechunk, decode_message, decode_version};
pub use encode::{encode_handshake, encode_message, write_chunked};
pub use message::{BackendMessage, FailureFields, FrontendMessage};
pub use packstream::{Structure, Value};
