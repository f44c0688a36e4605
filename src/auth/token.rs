//! Auth tokens

use crate::protocol::Value;
use std::collections::BTreeMap;

/// Credentials presented to the server in the INIT request.
///
/// `Debug` never prints the credentials.
#[derive(Clone, PartialEq)]
pub struct AuthToken {
    scheme: String,
    principal: Option<String>,
    credentials: Option<String>,
    realm: Option<String>,
}

impl AuthToken {
    /// Username/password authentication
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            scheme: "basic".into(),
            principal: Some(user.into()),
            credentials: Some(password.into()),
            realm: None,
        }
    }

    /// No authentication (servers with auth disabled)
    pub fn none() -> Self {
        Self {
            scheme: "none".into(),
            principal: None,
            credentials: None,
            realm: None,
        }
    }

    /// Set the authentication realm
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Scheme name (`basic`, `none`)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Principal (username), if any
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Encode as the INIT auth map
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("scheme".to_string(), Value::from(self.scheme.as_str()));
        if let Some(ref principal) = self.principal {
            map.insert("principal".to_string(), Value::from(principal.as_str()));
        }
        if let Some(ref credentials) = self.credentials {
            map.insert("credentials".to_string(), Value::from(credentials.as_str()));
        }
        if let Some(ref realm) = self.realm {
            map.insert("realm".to_string(), Value::from(realm.as_str()));
        }
        map
    }
}

impl Default for AuthToken {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("scheme", &self.scheme)
            .field("principal", &self.principal)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .field("realm", &self.realm)
            .finish()
    }
}
