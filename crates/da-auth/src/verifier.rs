//! Credential verifier capability.
//!
//! A verifier checks a username and password against a realm and hands back
//! a [`Credential`]. The credential can then request service tickets without
//! the password being presented again.
//!
//! ## Security
//!
//! - Passwords are passed as [`SecretString`] and must never be logged.
//! - The [`VerifierContext`] supplies the current time and the random
//!   source for protocol nonces. Production contexts must use
//!   [`SystemClock`] and [`SecureRandom`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use secrecy::SecretString;

use crate::error::VerifierError;
use crate::realm::Realm;

// ============================================================================
// Time and Randomness
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of protocol nonces and random bytes.
pub trait NonceSource: Send + Sync {
    /// Returns a fresh nonce.
    fn nonce(&self) -> u32;

    /// Fills `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Cryptographically secure randomness from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureRandom;

impl NonceSource for SecureRandom {
    fn nonce(&self) -> u32 {
        rand::rng().random()
    }

    fn fill(&self, buf: &mut [u8]) {
        rand::rng().fill(buf);
    }
}

/// Per-login verification context.
///
/// Built fresh for every login so no protocol state is shared between
/// attempts.
#[derive(Clone)]
pub struct VerifierContext {
    clock: Arc<dyn Clock>,
    random: Arc<dyn NonceSource>,
    created_at: DateTime<Utc>,
}

impl VerifierContext {
    /// Creates a context from explicit sources.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn NonceSource>) -> Self {
        let created_at = clock.now();
        Self {
            clock,
            random,
            created_at,
        }
    }

    /// Creates a context using wall-clock time and secure randomness.
    #[must_use]
    pub fn secure() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(SecureRandom))
    }

    /// Returns the current time from the context's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the time the context was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a fresh nonce.
    #[must_use]
    pub fn nonce(&self) -> u32 {
        self.random.nonce()
    }

    /// Fills `buf` with random bytes.
    pub fn fill_random(&self, buf: &mut [u8]) {
        self.random.fill(buf);
    }
}

impl fmt::Debug for VerifierContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierContext")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Flags requested for a service ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketOptions {
    /// Request a forwardable ticket.
    pub forwardable: bool,
    /// Request a renewable ticket.
    pub renewable: bool,
}

/// A service ticket issued for a verified credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceTicket {
    /// Service principal the ticket is for, e.g. `krbtgt/EXAMPLE.COM`.
    pub service: String,
    /// Client principal name.
    pub client: String,
    /// Realm of the client principal.
    pub realm: Realm,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// End of validity, when the verifier reports it.
    pub end_time: Option<DateTime<Utc>>,
    /// Encoded ticket. Never logged.
    pub encoded: Vec<u8>,
}

impl ServiceTicket {
    /// Creates a ticket record.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        client: impl Into<String>,
        realm: Realm,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            service: service.into(),
            client: client.into(),
            realm,
            issued_at,
            end_time: None,
            encoded: Vec::new(),
        }
    }

    /// Sets the end of validity.
    #[must_use]
    pub const fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the encoded ticket.
    #[must_use]
    pub fn with_encoded(mut self, encoded: Vec<u8>) -> Self {
        self.encoded = encoded;
        self
    }
}

impl fmt::Debug for ServiceTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTicket")
            .field("service", &self.service)
            .field("client", &self.client)
            .field("realm", &self.realm)
            .field("issued_at", &self.issued_at)
            .field("end_time", &self.end_time)
            .field("encoded", &format_args!("[{} bytes]", self.encoded.len()))
            .finish()
    }
}

// ============================================================================
// Verifier Traits
// ============================================================================

/// A credential accepted by a [`CredentialVerifier`].
#[async_trait]
pub trait Credential: Send + Sync {
    /// Returns the client principal name.
    fn principal(&self) -> &str;

    /// Returns the realm the credential was verified in.
    fn realm(&self) -> &Realm;

    /// Requests a ticket for `service` using this credential.
    async fn get_ticket(
        &self,
        service: &str,
        options: TicketOptions,
    ) -> Result<ServiceTicket, VerifierError>;
}

/// Verifies usernames and passwords against a realm.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the verifier identifier, used in logs.
    fn id(&self) -> &'static str;

    /// Verifies the password and returns the resulting credential.
    ///
    /// ## Security
    ///
    /// The password must not be logged, stored, or forwarded anywhere but
    /// the realm's authentication service.
    async fn verify(
        &self,
        username: &str,
        realm: &Realm,
        password: &SecretString,
        context: &VerifierContext,
    ) -> Result<Box<dyn Credential>, VerifierError>;
}
