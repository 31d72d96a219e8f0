//! Directory group to internal role mapping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::directory::GroupId;

/// Maps directory group identifiers to internal role identifiers.
///
/// Keys are compared exactly against [`GroupId::as_str`]. Groups with no
/// entry contribute nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupMap(HashMap<String, String>);

impl GroupMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the role mapped to a group, if any.
    #[must_use]
    pub fn role_for(&self, group: &str) -> Option<&str> {
        self.0.get(group).map(String::as_str)
    }

    /// Maps groups to roles.
    ///
    /// Output follows the order of `groups`. A group listed twice yields its
    /// role twice.
    #[must_use]
    pub fn roles_for<'a, I>(&self, groups: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a GroupId>,
    {
        groups
            .into_iter()
            .filter_map(|group| {
                let role = self.role_for(group.as_str());
                tracing::debug!(group = %group, role = ?role, "Checking directory group");
                role
            })
            .map(String::from)
            .collect()
    }

    /// Number of mapped groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if no group is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for GroupMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<HashMap<String, String>> for GroupMap {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<BTreeMap<String, String>> for GroupMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}
