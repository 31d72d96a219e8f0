//! # da-federation-ldap
//!
//! LDAP directory resolver for dirauth, using `ldap3`.
//!
//! The resolver opens one session per login, bound either with a service
//! account or (with the `gssapi` feature) with the process's default
//! Kerberos credential cache. The bind identity is never the user's, and
//! the user's password never reaches the directory. Instead each session is
//! tied to the verified credential: it is refused for a credential from
//! another realm, and it only looks up the credential's own principal.
//!
//! ## Security Requirements
//!
//! - All connections use LDAPS (TLS from connection start)
//! - STARTTLS and plain LDAP are rejected at configuration time
//! - Bind credentials are never logged

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod dn;
pub mod error;
pub mod resolver;
pub mod search;

pub use config::{BindMode, LdapConfig, LdapConfigBuilder, SearchScope, UsernameAttribute};
pub use dn::canonicalize_dn;
pub use error::{LdapError, LdapResult};
pub use resolver::{LdapDirectoryResolver, LdapDirectorySession};
