//! Authentication realm.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Service name prefix of the ticket-granting service.
pub const TGS_SERVICE: &str = "krbtgt";

/// A Kerberos realm name in canonical (upper-case) form.
///
/// Realms returned by key distribution centers are upper-case, so the name
/// is normalized once here and compared verbatim everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Realm(String);

impl Realm {
    /// Creates a realm, upper-casing the name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_uppercase())
    }

    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ticket-granting service principal, `krbtgt/<REALM>`.
    #[must_use]
    pub fn krbtgt_service(&self) -> String {
        format!("{TGS_SERVICE}/{}", self.0)
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Realm {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Realm {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Realm> for String {
    fn from(realm: Realm) -> Self {
        realm.0
    }
}

impl AsRef<str> for Realm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
