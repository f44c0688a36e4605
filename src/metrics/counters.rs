//! Counter metrics

use super::labels;

/// A connection (plain or secured) was established
pub fn connection_established(secured: bool) {
    metrics::counter!(labels::CONNECTIONS_TOTAL, "secured" => secured.to_string()).increment(1);
}

/// Establishing a connection failed; `kind` is [`crate::Error::category`]
pub fn connection_error(kind: &'static str) {
    metrics::counter!(labels::CONNECTION_ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// A trust strategy judged a certificate
pub fn trust_decision(strategy: &'static str, decision: &'static str) {
    metrics::counter!(
        labels::TRUST_DECISIONS_TOTAL,
        "strategy" => strategy,
        "decision" => decision
    )
    .increment(1);
}

/// INIT sent
pub fn auth_attempted(scheme: &str) {
    metrics::counter!(labels::AUTH_ATTEMPTS_TOTAL, "scheme" => scheme.to_string()).increment(1);
}

/// INIT answered with SUCCESS
pub fn auth_successful(scheme: &str) {
    metrics::counter!(labels::AUTH_SUCCESSFUL_TOTAL, "scheme" => scheme.to_string())
        .increment(1);
}

/// INIT did not authenticate
pub fn auth_failed(scheme: &str, reason: &'static str) {
    metrics::counter!(
        labels::AUTH_FAILED_TOTAL,
        "scheme" => scheme.to_string(),
        "reason" => reason
    )
    .increment(1);
}
