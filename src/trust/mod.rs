//! Server trust
//!
//! This module handles:
//! * Server identities and certificate fingerprints
//! * Trust strategies (disabled, trust-on-first-use, custom CA, system CA)
//! * The persisted known_hosts table used for trust-on-first-use

mod identity;
pub mod store;
mod strategy;

pub use identity::{CertificateFingerprint, ServerIdentity};
pub use store::{CertificateStore, PinOutcome, TrustRecord};
pub use strategy::{PresentedCertificate, TrustDecision, TrustStrategy, TrustStrategyKind};
