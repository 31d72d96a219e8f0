//! Principal search.

use std::collections::HashMap;

use da_auth::{GroupId, PrincipalRecord};
use ldap3::{Ldap, SearchEntry};

use crate::config::LdapConfig;
use crate::dn::canonicalize_dn;
use crate::error::{LdapError, LdapResult};

/// Represents an LDAP entry with parsed attributes.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,

    /// Binary attributes.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Creates a new LDAP entry from search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// Gets a single-valued attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attrs(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Gets a multi-valued attribute. Attribute names match case-insensitively.
    #[must_use]
    pub fn get_attrs(&self, name: &str) -> Option<&Vec<String>> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Gets a binary attribute.
    #[must_use]
    pub fn get_binary_attr(&self, name: &str) -> Option<&Vec<u8>> {
        self.binary_attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
    }

    /// Gets the external ID (UUID attribute value).
    #[must_use]
    pub fn external_id(&self, uuid_attr: &str) -> Option<String> {
        // Try text first
        if let Some(val) = self.get_attr(uuid_attr) {
            return Some(val.to_string());
        }

        // Try binary (for Active Directory objectGUID)
        self.get_binary_attr(uuid_attr).map(|bytes| format_guid(bytes))
    }

    /// Converts the entry to a principal record.
    ///
    /// Membership values are canonicalized and keep the order the server
    /// returned them in.
    #[must_use]
    pub fn to_principal_record(&self, config: &LdapConfig) -> PrincipalRecord {
        let member = self
            .get_attrs(&config.membership_attribute)
            .into_iter()
            .flatten()
            .map(|dn| GroupId::new(canonicalize_dn(dn)));

        let mut record = PrincipalRecord::new(canonicalize_dn(&self.dn), member);
        record.user_principal_name = self.get_attr("userPrincipalName").map(str::to_string);
        record.object_guid = self.external_id(&config.uuid_attribute);
        record
    }
}

/// Formats a binary GUID (Active Directory format) as a string.
fn format_guid(bytes: &[u8]) -> String {
    if bytes.len() != 16 {
        return hex::encode(bytes);
    }

    // Active Directory GUID format (mixed endianness)
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[3], bytes[2], bytes[1], bytes[0],
        bytes[5], bytes[4],
        bytes[7], bytes[6],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

/// Looks up principals over a bound connection.
pub struct PrincipalSearcher<'a> {
    ldap: Ldap,
    config: &'a LdapConfig,
}

impl<'a> PrincipalSearcher<'a> {
    /// Creates a new searcher.
    #[must_use]
    pub fn new(ldap: Ldap, config: &'a LdapConfig) -> Self {
        Self { ldap, config }
    }

    /// Finds the entry for `username` below `base_dn`.
    ///
    /// Returns `Ok(None)` when nothing matches and an error when more than
    /// one entry does.
    pub async fn find_principal(
        &mut self,
        base_dn: &str,
        username: &str,
    ) -> LdapResult<Option<LdapEntry>> {
        let filter = self.config.principal_filter(username);
        let attrs = self.config.principal_attributes();

        tracing::debug!(base_dn, filter = %filter, "LDAP principal search");

        let (results, _) = self
            .ldap
            .with_timeout(self.config.operation_timeout)
            .search(base_dn, self.config.search_scope.to_ldap3(), &filter, attrs)
            .await
            .map_err(|e| LdapError::search(e.to_string()))?
            .success()
            .map_err(|e| LdapError::search(format!("Search failed: {e}")))?;

        let mut entries = results
            .into_iter()
            .map(|r| LdapEntry::from_search_entry(SearchEntry::construct(r)));

        let Some(entry) = entries.next() else {
            return Ok(None);
        };

        if entries.next().is_some() {
            return Err(LdapError::AmbiguousPrincipal(username.to_string()));
        }

        Ok(Some(entry))
    }
}
