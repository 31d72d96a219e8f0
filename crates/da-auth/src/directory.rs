//! Directory resolver capability.
//!
//! A directory session is opened with a credential that the verifier has
//! already accepted. Implementations must rely on that proven identity and
//! never ask for the user's password again.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::realm::Realm;
use crate::verifier::Credential;

/// A directory group identifier in canonical string form.
///
/// For LDAP directories this is the group's distinguished name, e.g.
/// `CN=Admins,OU=Groups,DC=example,DC=com`. Group map keys are compared
/// against this string verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a group identifier from its canonical form.
    #[must_use]
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A principal's directory record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Distinguished name of the entry.
    pub distinguished_name: String,

    /// Group memberships in the order the directory returned them.
    pub member: Vec<GroupId>,

    /// `userPrincipalName`, when the directory exposes it.
    pub user_principal_name: Option<String>,

    /// Stable object identifier, when the directory exposes it.
    pub object_guid: Option<String>,
}

impl PrincipalRecord {
    /// Creates a record with the given groups.
    #[must_use]
    pub fn new<I, G>(distinguished_name: impl Into<String>, member: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        Self {
            distinguished_name: distinguished_name.into(),
            member: member.into_iter().map(Into::into).collect(),
            user_principal_name: None,
            object_guid: None,
        }
    }
}

/// An open, authenticated directory session.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Looks up a principal by username within a realm.
    ///
    /// Returns `Ok(None)` when the lookup completed but found no entry.
    async fn lookup_principal(
        &self,
        username: &str,
        realm: &Realm,
    ) -> Result<Option<PrincipalRecord>, DirectoryError>;

    /// Closes the session. The default does nothing.
    async fn close(&self) {}
}

/// Opens directory sessions for verified credentials.
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Returns the resolver identifier, used in logs.
    fn id(&self) -> &'static str;

    /// Opens a session authenticated by `credential`.
    async fn open(
        &self,
        credential: &dyn Credential,
        realm: &Realm,
    ) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}
