//! LDAP directory configuration.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: Only LDAPS (LDAP over TLS) is supported.
//!
//! - Connection URLs MUST start with `ldaps://`
//! - STARTTLS is NOT supported (vulnerable to downgrade attacks)
//! - Plain `ldap://` is NOT supported (credentials transmitted in cleartext)

use std::time::Duration;

use da_auth::Realm;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dn::realm_base_dn;
use crate::error::{LdapError, LdapResult};

// ============================================================================
// Bind Mode
// ============================================================================

/// How a directory session authenticates to the server.
///
/// Neither mode uses the password of the user logging in; the user's
/// identity has already been proven by the credential verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BindMode {
    /// Simple bind as a read-only service account.
    ServiceAccount {
        /// Service account DN.
        bind_dn: String,
        /// Service account password.
        #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
        bind_credential: SecretString,
    },

    /// SASL GSSAPI bind using the process's default Kerberos credential
    /// cache. This is the service's own identity, not the credential the
    /// verifier proved for the user.
    #[cfg(feature = "gssapi")]
    Gssapi {
        /// Fully qualified host name of the directory server.
        server_fqdn: String,
    },
}

impl BindMode {
    /// Creates a service account bind.
    #[must_use]
    pub fn service_account(bind_dn: impl Into<String>, bind_credential: impl Into<String>) -> Self {
        Self::ServiceAccount {
            bind_dn: bind_dn.into(),
            bind_credential: SecretString::from(bind_credential.into()),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

// ============================================================================
// Username Attribute
// ============================================================================

/// Attribute used for username lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsernameAttribute {
    /// sAMAccountName (Active Directory).
    #[default]
    SamAccountName,
    /// userPrincipalName (Active Directory, `user@realm` form).
    UserPrincipalName,
    /// uid attribute (common for Unix/Linux).
    Uid,
    /// Custom attribute name.
    Custom(String),
}

impl UsernameAttribute {
    /// Returns the LDAP attribute name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SamAccountName => "sAMAccountName",
            Self::UserPrincipalName => "userPrincipalName",
            Self::Uid => "uid",
            Self::Custom(name) => name,
        }
    }
}

/// LDAP search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    /// Search only the base DN.
    Base,
    /// Search one level below the base DN.
    OneLevel,
    /// Search the entire subtree.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Converts to ldap3 scope.
    #[must_use]
    pub fn to_ldap3(&self) -> ldap3::Scope {
        match self {
            Self::Base => ldap3::Scope::Base,
            Self::OneLevel => ldap3::Scope::OneLevel,
            Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

// ============================================================================
// LDAP Configuration
// ============================================================================

/// LDAP directory configuration.
///
/// ## Security Requirements
///
/// The `connection_url` MUST use the `ldaps://` scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server URL (MUST be ldaps://).
    pub connection_url: String,

    /// Session bind.
    pub bind: BindMode,

    /// Whether to validate server certificates.
    /// Should always be true in production.
    #[serde(default = "default_true")]
    pub validate_certificates: bool,

    /// Base DN for principal searches. Derived from the realm when absent.
    #[serde(default)]
    pub base_dn: Option<String>,

    /// Object class of user entries.
    #[serde(default = "default_user_object_class")]
    pub user_object_class: String,

    /// Attribute matched against the username.
    #[serde(default)]
    pub username_attribute: UsernameAttribute,

    /// Attribute listing group memberships.
    #[serde(default = "default_membership_attribute")]
    pub membership_attribute: String,

    /// Attribute holding the entry's stable identifier.
    #[serde(default = "default_uuid_attribute")]
    pub uuid_attribute: String,

    /// Search scope.
    #[serde(default)]
    pub search_scope: SearchScope,

    /// Connection timeout.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: Duration,

    /// Timeout for each bind and search.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout: Duration,
}

const fn default_true() -> bool {
    true
}

fn default_user_object_class() -> String {
    "user".to_string()
}

fn default_membership_attribute() -> String {
    "memberOf".to_string()
}

fn default_uuid_attribute() -> String {
    "objectGUID".to_string()
}

const fn default_connection_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

impl LdapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> LdapConfigBuilder {
        LdapConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// ## Security
    ///
    /// This method enforces LDAPS-only connections.
    pub fn validate(&self) -> LdapResult<()> {
        // CRITICAL: Enforce LDAPS-only
        validate_ldaps_url(&self.connection_url)?;

        match &self.bind {
            BindMode::ServiceAccount { bind_dn, .. } if bind_dn.trim().is_empty() => {
                return Err(LdapError::config("bind_dn cannot be empty"));
            }
            #[cfg(feature = "gssapi")]
            BindMode::Gssapi { server_fqdn } if server_fqdn.trim().is_empty() => {
                return Err(LdapError::config("server_fqdn cannot be empty"));
            }
            _ => {}
        }

        if self.base_dn.as_deref().is_some_and(|dn| dn.trim().is_empty()) {
            return Err(LdapError::config("base_dn cannot be empty when set"));
        }

        if self.user_object_class.trim().is_empty() {
            return Err(LdapError::config("user_object_class cannot be empty"));
        }

        if self.membership_attribute.trim().is_empty() {
            return Err(LdapError::config("membership_attribute cannot be empty"));
        }

        Ok(())
    }

    /// Returns the search base for a realm.
    #[must_use]
    pub fn base_dn_for(&self, realm: &Realm) -> String {
        self.base_dn
            .clone()
            .unwrap_or_else(|| realm_base_dn(realm.as_str()))
    }

    /// Gets the search filter for a principal.
    #[must_use]
    pub fn principal_filter(&self, username: &str) -> String {
        let username_attr = self.username_attribute.as_str();
        let escaped = ldap_escape(username);
        format!(
            "(&(objectClass={})({username_attr}={escaped}))",
            self.user_object_class
        )
    }

    /// Attributes requested for a principal.
    #[must_use]
    pub fn principal_attributes(&self) -> Vec<&str> {
        vec![
            self.membership_attribute.as_str(),
            self.uuid_attribute.as_str(),
            "userPrincipalName",
        ]
    }
}

/// Validates that a URL uses LDAPS.
fn validate_ldaps_url(url: &str) -> LdapResult<()> {
    let url_lower = url.to_lowercase();

    if !url_lower.starts_with("ldaps://") {
        return Err(LdapError::InsecureProtocol);
    }

    if url.len() <= "ldaps://".len() {
        return Err(LdapError::config("Invalid LDAPS URL: missing host"));
    }

    Ok(())
}

/// Escapes special characters in LDAP filter values.
pub(crate) fn ldap_escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for LDAP configuration.
#[derive(Debug, Default)]
pub struct LdapConfigBuilder {
    connection_url: Option<String>,
    bind: Option<BindMode>,
    validate_certificates: Option<bool>,
    base_dn: Option<String>,
    user_object_class: Option<String>,
    username_attribute: UsernameAttribute,
    membership_attribute: Option<String>,
    uuid_attribute: Option<String>,
    search_scope: SearchScope,
    connection_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
}

impl LdapConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    #[must_use]
    pub fn connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    /// Binds with a service account.
    #[must_use]
    pub fn service_account(mut self, bind_dn: impl Into<String>, bind_credential: impl Into<String>) -> Self {
        self.bind = Some(BindMode::service_account(bind_dn, bind_credential));
        self
    }

    /// Sets the bind mode.
    #[must_use]
    pub fn bind(mut self, bind: BindMode) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Sets whether to validate certificates.
    #[must_use]
    pub const fn validate_certificates(mut self, validate: bool) -> Self {
        self.validate_certificates = Some(validate);
        self
    }

    /// Sets the search base.
    #[must_use]
    pub fn base_dn(mut self, dn: impl Into<String>) -> Self {
        self.base_dn = Some(dn.into());
        self
    }

    /// Sets the user object class.
    #[must_use]
    pub fn user_object_class(mut self, class: impl Into<String>) -> Self {
        self.user_object_class = Some(class.into());
        self
    }

    /// Sets the username attribute.
    #[must_use]
    pub fn username_attribute(mut self, attr: UsernameAttribute) -> Self {
        self.username_attribute = attr;
        self
    }

    /// Sets the membership attribute.
    #[must_use]
    pub fn membership_attribute(mut self, attr: impl Into<String>) -> Self {
        self.membership_attribute = Some(attr.into());
        self
    }

    /// Sets the identifier attribute.
    #[must_use]
    pub fn uuid_attribute(mut self, attr: impl Into<String>) -> Self {
        self.uuid_attribute = Some(attr.into());
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn search_scope(mut self, scope: SearchScope) -> Self {
        self.search_scope = scope;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> LdapResult<LdapConfig> {
        let config = LdapConfig {
            connection_url: self
                .connection_url
                .ok_or_else(|| LdapError::config("connection_url is required"))?,
            bind: self
                .bind
                .ok_or_else(|| LdapError::config("bind is required"))?,
            validate_certificates: self.validate_certificates.unwrap_or(true),
            base_dn: self.base_dn,
            user_object_class: self
                .user_object_class
                .unwrap_or_else(default_user_object_class),
            username_attribute: self.username_attribute,
            membership_attribute: self
                .membership_attribute
                .unwrap_or_else(default_membership_attribute),
            uuid_attribute: self.uuid_attribute.unwrap_or_else(default_uuid_attribute),
            search_scope: self.search_scope,
            connection_timeout: self
                .connection_timeout
                .unwrap_or_else(default_connection_timeout),
            operation_timeout: self
                .operation_timeout
                .unwrap_or_else(default_operation_timeout),
        };

        // Validate configuration (includes LDAPS check)
        config.validate()?;

        Ok(config)
    }
}
