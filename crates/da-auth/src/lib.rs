//! # da-auth
//!
//! Directory-backed authentication for dirauth.
//!
//! A login proves a username/password pair against a Kerberos realm,
//! obtains a `krbtgt` ticket with the verified credential, reads the
//! principal's group membership from a directory, and maps those groups to
//! internal roles.
//!
//! The protocol mechanics stay behind two capability traits:
//!
//! - [`CredentialVerifier`] / [`Credential`]: password verification and
//!   ticket issuance
//! - [`DirectoryResolver`] / [`DirectorySession`]: principal lookup
//!
//! ## Example
//!
//! ```ignore
//! use da_auth::{AuthenticatorConfig, DirectoryAuthenticator, GroupMap};
//! use secrecy::SecretString;
//!
//! let config = AuthenticatorConfig::new("example.com")
//!     .with_group_map(GroupMap::from_iter([("CN=Admins,DC=example,DC=com", "admin")]));
//! let authenticator = DirectoryAuthenticator::new(config, verifier, directory);
//!
//! let user = authenticator
//!     .login("jdoe", &SecretString::from("hunter2".to_string()))
//!     .await?;
//! assert_eq!(user.roles, vec!["admin"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod directory;
pub mod error;
pub mod group_map;
pub mod realm;
pub mod user;
pub mod verifier;

pub use authenticator::{Authenticator, AuthenticatorConfig, DirectoryAuthenticator};
pub use directory::{DirectoryResolver, DirectorySession, GroupId, PrincipalRecord};
pub use error::{AuthError, AuthResult, DirectoryError, LoginStage, VerifierError};
pub use group_map::GroupMap;
pub use realm::Realm;
pub use user::AuthenticatedUser;
pub use verifier::{
    Clock, Credential, CredentialVerifier, NonceSource, SecureRandom, ServiceTicket, SystemClock,
    TicketOptions, VerifierContext,
};
