//! Driver configuration validation
//!
//! Runs once at driver construction, before any socket is opened.

use super::config::{DriverConfig, Topology};
use crate::trust::{CertificateStore, TrustStrategy, TrustStrategyKind};
use crate::{Error, Result};
use std::sync::Arc;

/// Outcome of a successful validation
#[derive(Debug, Clone)]
pub struct ValidatedSecurity {
    /// Strategy every connection of the driver uses
    pub strategy: TrustStrategy,
    /// Store handle, present only under trust-on-first-use
    pub store: Option<Arc<CertificateStore>>,
}

/// Strategy kind in effect once `encrypted` is taken into account
pub fn effective_trust(config: &DriverConfig) -> TrustStrategyKind {
    if config.encrypted {
        config.trust.clone()
    } else {
        TrustStrategyKind::Disabled
    }
}

/// Check `config` against `topology` and resolve the trust strategy.
///
/// # Errors
///
/// * `Error::NotImplemented` if a custom CA is selected, whatever the other settings
/// * `Error::Config` for trust-on-first-use with a routing topology, or a routing
///   topology without seed addresses
pub fn validate(config: &DriverConfig, topology: &Topology) -> Result<ValidatedSecurity> {
    if let TrustStrategyKind::TrustCustomCa(ref path) = config.trust {
        return Err(Error::NotImplemented(format!(
            "custom CA trust ({}) is not supported; use trust-system-ca or trust-on-first-use",
            path.display()
        )));
    }

    if let Topology::Routing(seeds) = topology {
        if seeds.is_empty() {
            return Err(Error::Config("routing topology needs at least one address".into()));
        }
        if config.trust == TrustStrategyKind::TrustOnFirstUse {
            return Err(Error::Config(
                "trust-on-first-use is not compatible with routing: the server behind a \
                 routing address may change between connections"
                    .into(),
            ));
        }
    }

    let validated = match effective_trust(config) {
        TrustStrategyKind::Disabled => ValidatedSecurity {
            strategy: TrustStrategy::Disabled,
            store: None,
        },
        TrustStrategyKind::TrustOnFirstUse => {
            let path = match config.known_hosts_path {
                Some(ref path) => path.clone(),
                None => CertificateStore::default_path()?,
            };
            let store = Arc::new(CertificateStore::open(path));
            ValidatedSecurity {
                strategy: TrustStrategy::trust_on_first_use(store.clone()),
                store: Some(store),
            }
        }
        TrustStrategyKind::TrustSystemCa => ValidatedSecurity {
            strategy: TrustStrategy::system_ca()?,
            store: None,
        },
        TrustStrategyKind::TrustCustomCa(path) => {
            return Err(Error::NotImplemented(format!(
                "custom CA trust ({}) is not supported",
                path.display()
            )))
        }
    };

    tracing::debug!(strategy = validated.strategy.label(), "driver configuration validated");
    Ok(validated)
}
