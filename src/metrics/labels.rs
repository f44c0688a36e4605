//! Metric names and label values

/// Connections established
pub const CONNECTIONS_TOTAL: &str = "bolt_wire_connections_total";
/// Failed establishment or login attempts
pub const CONNECTION_ERRORS_TOTAL: &str = "bolt_wire_connection_errors_total";
/// Trust decisions made
pub const TRUST_DECISIONS_TOTAL: &str = "bolt_wire_trust_decisions_total";
/// INIT messages sent
pub const AUTH_ATTEMPTS_TOTAL: &str = "bolt_wire_auth_attempts_total";
/// INIT exchanges answered with SUCCESS
pub const AUTH_SUCCESSFUL_TOTAL: &str = "bolt_wire_auth_successful_total";
/// INIT exchanges that did not authenticate
pub const AUTH_FAILED_TOTAL: &str = "bolt_wire_auth_failed_total";
/// Socket open + TLS handshake duration
pub const HANDSHAKE_DURATION_MS: &str = "bolt_wire_handshake_duration_ms";
/// Bolt handshake + INIT duration
pub const AUTH_DURATION_MS: &str = "bolt_wire_auth_duration_ms";

/// Strategy label: plain TCP
pub const STRATEGY_DISABLED: &str = "disabled";
/// Strategy label: trust-on-first-use
pub const STRATEGY_TOFU: &str = "trust_on_first_use";
/// Strategy label: platform roots
pub const STRATEGY_SYSTEM_CA: &str = "trust_system_ca";

/// Decision label: accepted
pub const DECISION_ACCEPT: &str = "accept";
/// Decision label: rejected
pub const DECISION_REJECT: &str = "reject";

/// Auth failure reason: server answered FAILURE
pub const AUTH_REJECTED: &str = "rejected";
/// Auth failure reason: drop or unexpected reply
pub const AUTH_PROTOCOL_ERROR: &str = "protocol_error";
