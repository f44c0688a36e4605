//! Driver configuration

use crate::auth::AuthToken;
use crate::trust::{ServerIdentity, TrustStrategyKind};
use std::path::PathBuf;
use std::time::Duration;

/// Default user agent sent with INIT
pub const DEFAULT_USER_AGENT: &str = concat!("bolt-wire/", env!("CARGO_PKG_VERSION"));

/// Servers a driver connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// One fixed server
    Direct(ServerIdentity),
    /// Cluster reached through a routing layer; the addresses are seeds
    Routing(Vec<ServerIdentity>),
}

impl Topology {
    /// Whether this topology involves routing
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::Routing(_))
    }

    /// Address used by [`crate::Driver::connect`]: the server, or the first seed
    pub fn primary(&self) -> Option<&ServerIdentity> {
        match self {
            Self::Direct(address) => Some(address),
            Self::Routing(seeds) => seeds.first(),
        }
    }
}

/// Driver configuration
///
/// Use `DriverConfig::builder()` for a fluent API.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Negotiate TLS (default: true). When false the trust strategy is ignored.
    pub encrypted: bool,
    /// How server certificates are trusted (default: system CA)
    pub trust: TrustStrategyKind,
    /// known_hosts table for trust-on-first-use (default: `$HOME/.neo4j/known_hosts`)
    pub known_hosts_path: Option<PathBuf>,
    /// User agent sent with INIT
    pub user_agent: String,
    /// Bound on TCP connect plus TLS handshake (default: none)
    pub connect_timeout: Option<Duration>,
    /// Credentials (default: URI credentials, else no auth)
    pub auth: Option<AuthToken>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            encrypted: true,
            trust: TrustStrategyKind::default(),
            known_hosts_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: None,
            auth: None,
        }
    }
}

impl DriverConfig {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```
    /// use bolt_wire::DriverConfig;
    /// use bolt_wire::trust::TrustStrategyKind;
    ///
    /// let config = DriverConfig::builder()
    ///     .trust(TrustStrategyKind::TrustOnFirstUse)
    ///     .known_hosts_path("/tmp/known_hosts")
    ///     .build();
    /// assert!(config.encrypted);
    /// ```
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder {
            config: DriverConfig::default(),
        }
    }
}

/// Builder for [`DriverConfig`]
#[derive(Debug, Clone)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// Enable or disable TLS
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.config.encrypted = encrypted;
        self
    }

    /// Set the trust strategy
    pub fn trust(mut self, trust: TrustStrategyKind) -> Self {
        self.config.trust = trust;
        self
    }

    /// Set the known_hosts table location
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.known_hosts_path = Some(path.into());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout
    ///
    /// Default: None (no timeout)
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.config.connect_timeout = Some(duration);
        self
    }

    /// Set credentials
    pub fn auth(mut self, auth: AuthToken) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Build the configuration
    pub fn build(self) -> DriverConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert!(config.encrypted);
        assert_eq!(config.trust, TrustStrategyKind::TrustSystemCa);
        assert!(config.known_hosts_path.is_none());
        assert!(config.user_agent.starts_with("bolt-wire/"));
        assert!(config.connect_timeout.is_none());
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_builder_fluent() {
        let config = DriverConfig::builder()
            .encrypted(false)
            .trust(TrustStrategyKind::TrustOnFirstUse)
            .known_hosts_path("/tmp/hosts")
            .user_agent("app/2.0")
            .connect_timeout(Duration::from_secs(5))
            .auth(AuthToken::basic("neo4j", "secret"))
            .build();

        assert!(!config.encrypted);
        assert_eq!(config.trust, TrustStrategyKind::TrustOnFirstUse);
        assert_eq!(config.known_hosts_path, Some(PathBuf::from("/tmp/hosts")));
        assert_eq!(config.user_agent, "app/2.0");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.auth.unwrap().principal(), Some("neo4j"));
    }

    #[test]
    fn test_topology_primary() {
        let a = ServerIdentity::new("a", 7687);
        let b = ServerIdentity::new("b", 7687);

        assert_eq!(Topology::Direct(a.clone()).primary(), Some(&a));
        assert_eq!(Topology::Routing(vec![b.clone(), a]).primary(), Some(&b));
        assert_eq!(Topology::Routing(vec![]).primary(), None);
        assert!(!Topology::Direct(b).is_routing());
    }
}
