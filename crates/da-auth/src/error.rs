//! Authentication error types.
//!
//! ## Security Note
//!
//! `AuthError` keeps the failing stage for operators, but end users should
//! only ever see [`AuthError::public_message`]. That message does not reveal
//! whether the username exists or which stage rejected the login.

use std::fmt;

use thiserror::Error;

/// Stage of a login at which a deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    /// Credential verification and ticket issuance.
    Verify,
    /// Directory session and principal lookup.
    Directory,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => write!(f, "credential verification"),
            Self::Directory => write!(f, "directory lookup"),
        }
    }
}

/// Errors reported by a credential verifier.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The principal does not exist in the realm.
    #[error("principal unknown to the realm")]
    PrincipalUnknown,

    /// Pre-authentication failed (wrong password).
    #[error("pre-authentication failed")]
    PreauthFailed,

    /// The realm's key distribution center could not be reached.
    #[error("realm unreachable: {0}")]
    Unreachable(String),

    /// Local and realm clocks differ too much.
    #[error("clock skew too great")]
    ClockSkew,

    /// The realm refused the request by policy (locked, expired, restricted).
    #[error("rejected by realm policy: {0}")]
    Policy(String),

    /// Malformed or unexpected protocol response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl VerifierError {
    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Creates a policy error.
    #[must_use]
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Errors reported by a directory resolver or session.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Could not connect to the directory.
    #[error("directory connection failed: {0}")]
    Connection(String),

    /// The directory refused the session's bind.
    #[error("directory bind failed: {0}")]
    Bind(String),

    /// The lookup could not be completed.
    #[error("directory search failed: {0}")]
    Search(String),

    /// A directory operation timed out.
    #[error("directory operation timed out")]
    Timeout,

    /// Malformed or unexpected directory response.
    #[error("directory protocol error: {0}")]
    Protocol(String),
}

impl DirectoryError {
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
}

/// Login errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The verifier rejected the username and password.
    #[error("invalid credentials")]
    InvalidCredentials(#[source] VerifierError),

    /// The credential was valid but the ticket was refused.
    #[error("credential valid but access denied for {service}")]
    TicketDenied {
        /// Service the ticket was requested for.
        service: String,
        /// Verifier diagnostic.
        #[source]
        source: VerifierError,
    },

    /// The directory could not be consulted.
    #[error("identity verified but directory unavailable")]
    DirectoryUnavailable(#[source] DirectoryError),

    /// The directory has no record for the verified principal.
    #[error("identity verified but directory record missing for {username}")]
    DirectoryRecordMissing {
        /// Username as supplied by the caller.
        username: String,
    },

    /// A configured stage deadline elapsed.
    #[error("{stage} timed out")]
    Timeout {
        /// Stage that timed out.
        stage: LoginStage,
    },
}

impl AuthError {
    /// Returns a short machine-readable kind for logs and audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials(_) => "invalid_credentials",
            Self::TicketDenied { .. } => "ticket_denied",
            Self::DirectoryUnavailable(_) => "directory_unavailable",
            Self::DirectoryRecordMissing { .. } => "directory_record_missing",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Checks if the credential itself was refused.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials(_) | Self::TicketDenied { .. } | Self::DirectoryRecordMissing { .. }
        )
    }

    /// Checks if the failure is a service problem worth retrying later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DirectoryUnavailable(_) | Self::Timeout { .. })
    }

    /// Returns the message safe to show to end users.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        if self.is_transient() {
            "authentication service temporarily unavailable"
        } else {
            "authentication failed"
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
