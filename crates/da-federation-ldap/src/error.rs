//! LDAP-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak sensitive information like
//! passwords or bind credentials.

use da_auth::DirectoryError;
use thiserror::Error;

/// LDAP-specific errors.
#[derive(Debug, Error)]
pub enum LdapError {
    /// Invalid configuration.
    #[error("LDAP configuration error: {0}")]
    Configuration(String),

    /// Connection URL must use LDAPS.
    #[error("Security error: Only LDAPS is supported. URL must start with 'ldaps://'. STARTTLS and plain LDAP are not allowed.")]
    InsecureProtocol,

    /// Connection failed.
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    /// Bind (authentication) failed.
    #[error("LDAP bind failed: {0}")]
    Bind(String),

    /// The credential belongs to another realm than the one requested.
    #[error("credential realm {credential} does not match requested realm {requested}")]
    RealmMismatch {
        /// Realm of the verified credential.
        credential: String,
        /// Realm the session was requested for.
        requested: String,
    },

    /// A lookup was requested for another principal than the session's.
    #[error("session for {credential} cannot look up {requested}")]
    PrincipalMismatch {
        /// Principal of the verified credential.
        credential: String,
        /// Username the lookup was requested for.
        requested: String,
    },

    /// Search operation failed.
    #[error("LDAP search failed: {0}")]
    Search(String),

    /// More than one entry matched a username.
    #[error("multiple directory entries match {0}")]
    AmbiguousPrincipal(String),
}

impl LdapError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a bind error.
    #[must_use]
    pub fn bind(msg: impl Into<String>) -> Self {
        Self::Bind(msg.into())
    }

    /// Creates a search error.
    #[must_use]
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Checks if this is a security-related error.
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::InsecureProtocol
                | Self::Bind(_)
                | Self::RealmMismatch { .. }
                | Self::PrincipalMismatch { .. }
        )
    }
}

/// Result type for LDAP operations.
pub type LdapResult<T> = Result<T, LdapError>;

impl From<LdapError> for DirectoryError {
    fn from(err: LdapError) -> Self {
        match err {
            LdapError::Configuration(_) | LdapError::InsecureProtocol => {
                DirectoryError::Connection(err.to_string())
            }
            LdapError::Connection(msg) => DirectoryError::Connection(msg),
            LdapError::Bind(msg) => DirectoryError::Bind(msg),
            LdapError::RealmMismatch { .. } | LdapError::PrincipalMismatch { .. } => {
                DirectoryError::Bind(err.to_string())
            }
            LdapError::Search(msg) => DirectoryError::Search(msg),
            LdapError::AmbiguousPrincipal(_) => DirectoryError::Search(err.to_string()),
        }
    }
}
