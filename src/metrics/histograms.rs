//! Histogram metrics

use super::labels;

/// Socket open plus (optional) TLS handshake, in milliseconds
pub fn handshake_duration(secured: bool, millis: u64) {
    metrics::histogram!(labels::HANDSHAKE_DURATION_MS, "secured" => secured.to_string())
        .record(millis as f64);
}

/// Bolt version negotiation plus INIT exchange, in milliseconds
pub fn auth_duration(scheme: &str, millis: u64) {
    metrics::histogram!(labels::AUTH_DURATION_MS, "scheme" => scheme.to_string())
        .record(millis as f64);
}
