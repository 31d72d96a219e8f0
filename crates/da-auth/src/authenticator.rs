//! Directory authenticator.
//!
//! A login runs four stages against a single configuration snapshot:
//!
//! 1. verify the password with the [`CredentialVerifier`]
//! 2. obtain a `krbtgt/<REALM>` ticket with the resulting credential
//! 3. open a directory session with that credential and look up the
//!    principal
//! 4. map the principal's groups to internal roles
//!
//! Any failure aborts the login; there is no partial result.
//!
//! ## Configuration
//!
//! The realm and group map live in an immutable [`AuthenticatorConfig`]
//! behind an atomically swapped pointer. [`DirectoryAuthenticator::setup`]
//! and [`DirectoryAuthenticator::set_realm`] publish a new snapshot; logins
//! already running keep the snapshot they started with.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use da_core::event::{Event, EventBuilder, EventSink, EventType, TracingEventSink};
use da_core::{Error as ConfigError, Settings};
use secrecy::SecretString;
use tracing::Instrument;
use uuid::Uuid;

use crate::directory::{DirectoryResolver, PrincipalRecord};
use crate::error::{AuthError, AuthResult, LoginStage};
use crate::group_map::GroupMap;
use crate::realm::Realm;
use crate::user::AuthenticatedUser;
use crate::verifier::{
    Clock, Credential, CredentialVerifier, NonceSource, SecureRandom, SystemClock, TicketOptions,
    VerifierContext,
};

// ============================================================================
// Configuration
// ============================================================================

/// Immutable authenticator configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorConfig {
    /// Normalized realm.
    pub realm: Realm,

    /// Directory group to role mapping.
    pub group_map: GroupMap,

    /// Deadline for verification and ticket issuance.
    pub verify_timeout: Option<Duration>,

    /// Deadline for the directory session and lookup.
    pub directory_timeout: Option<Duration>,
}

impl AuthenticatorConfig {
    /// Creates a configuration with an empty group map and no deadlines.
    #[must_use]
    pub fn new(realm: impl AsRef<str>) -> Self {
        Self {
            realm: Realm::new(realm),
            group_map: GroupMap::new(),
            verify_timeout: None,
            directory_timeout: None,
        }
    }

    /// Builds a configuration from settings, validating them first.
    pub fn from_settings(settings: &Settings) -> da_core::Result<Self> {
        settings.validate()?;

        Ok(Self {
            realm: Realm::new(&settings.realm),
            group_map: GroupMap::from(settings.group_map.clone()),
            verify_timeout: settings.login.verify_timeout(),
            directory_timeout: settings.login.directory_timeout(),
        })
    }

    /// Validates the configuration.
    ///
    /// An empty realm would request tickets for `krbtgt/`, and a zero
    /// deadline would fail every login.
    pub fn validate(&self) -> da_core::Result<()> {
        if self.realm.as_str().trim().is_empty() {
            return Err(ConfigError::validation("realm cannot be empty"));
        }
        if self.verify_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::validation("verify timeout must be positive"));
        }
        if self.directory_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::validation("directory timeout must be positive"));
        }
        Ok(())
    }

    /// Sets the group map.
    #[must_use]
    pub fn with_group_map(mut self, group_map: GroupMap) -> Self {
        self.group_map = group_map;
        self
    }

    /// Sets the verification deadline.
    #[must_use]
    pub const fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = Some(timeout);
        self
    }

    /// Sets the directory deadline.
    #[must_use]
    pub const fn with_directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Authenticator Trait
// ============================================================================

/// Username/password authenticator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the authenticator ID.
    fn id(&self) -> &'static str;

    /// Authenticates a user and resolves their roles.
    async fn login(&self, username: &str, password: &SecretString) -> AuthResult<AuthenticatedUser>;
}

// ============================================================================
// Directory Authenticator
// ============================================================================

/// Authenticator chaining a credential verifier and a directory resolver.
pub struct DirectoryAuthenticator {
    config: ArcSwap<AuthenticatorConfig>,
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn DirectoryResolver>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn NonceSource>,
}

impl DirectoryAuthenticator {
    /// Creates an authenticator using wall-clock time, secure randomness
    /// and tracing-backed audit events.
    #[must_use]
    pub fn new(
        config: AuthenticatorConfig,
        verifier: Arc<dyn CredentialVerifier>,
        directory: Arc<dyn DirectoryResolver>,
    ) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            verifier,
            directory,
            events: Arc::new(TracingEventSink::new()),
            clock: Arc::new(SystemClock),
            random: Arc::new(SecureRandom),
        }
    }

    /// Sets the audit event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the clock used for verification contexts and login times.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the random source used for verification contexts.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn NonceSource>) -> Self {
        self.random = random;
        self
    }

    /// Returns the current configuration snapshot.
    #[must_use]
    pub fn config(&self) -> Arc<AuthenticatorConfig> {
        self.config.load_full()
    }

    /// Replaces the group map.
    ///
    /// No validation is performed; an empty map is legal and matches
    /// nothing.
    pub fn setup(&self, mapping: impl Into<GroupMap>) {
        let mapping = mapping.into();
        let groups = mapping.len();

        self.config.rcu(|current| AuthenticatorConfig {
            group_map: mapping.clone(),
            ..AuthenticatorConfig::clone(current)
        });

        tracing::debug!(groups, "Directory authentication setup complete");
    }

    /// Sets the realm, upper-casing it.
    pub fn set_realm(&self, realm: impl AsRef<str>) {
        let realm = Realm::new(realm);

        self.config.rcu(|current| AuthenticatorConfig {
            realm: realm.clone(),
            ..AuthenticatorConfig::clone(current)
        });

        tracing::debug!(realm = %realm, "Directory authentication realm set");
    }

    /// Replaces the whole configuration.
    ///
    /// An invalid configuration is rejected and the current one stays in
    /// place.
    pub fn reload(&self, config: AuthenticatorConfig) -> da_core::Result<()> {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Rejected directory authentication configuration");
            return Err(e);
        }

        tracing::info!(
            realm = %config.realm,
            groups = config.group_map.len(),
            "Directory authentication configuration reloaded"
        );
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Authenticates a user and resolves their roles.
    ///
    /// ## Errors
    ///
    /// - [`AuthError::InvalidCredentials`]: the verifier rejected the password
    /// - [`AuthError::TicketDenied`]: the `krbtgt` ticket was refused
    /// - [`AuthError::DirectoryUnavailable`]: the directory could not be consulted
    /// - [`AuthError::DirectoryRecordMissing`]: no record for the principal
    /// - [`AuthError::Timeout`]: a configured stage deadline elapsed
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> AuthResult<AuthenticatedUser> {
        let config = self.config.load_full();
        let attempt_id = Uuid::now_v7();
        let span = tracing::info_span!(
            "login",
            attempt_id = %attempt_id,
            user = %username,
            realm = %config.realm
        );

        async move {
            self.emit(self.event(EventType::LoginAttempt, attempt_id, username, &config.realm))
                .await;

            let result = self.run_login(&config, attempt_id, username, password).await;

            match &result {
                Ok(user) => {
                    tracing::info!(roles = ?user.roles, "User logged in");
                    self.emit(
                        self.event(EventType::Login, attempt_id, username, &config.realm)
                            .success()
                            .detail("roles", user.roles.join(",")),
                    )
                    .await;
                }
                Err(err) => {
                    self.emit(
                        self.event(EventType::LoginError, attempt_id, username, &config.realm)
                            .failure(err.kind()),
                    )
                    .await;
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run_login(
        &self,
        config: &AuthenticatorConfig,
        attempt_id: Uuid,
        username: &str,
        password: &SecretString,
    ) -> AuthResult<AuthenticatedUser> {
        let realm = &config.realm;

        let credential = with_deadline(
            config.verify_timeout,
            LoginStage::Verify,
            self.verify(attempt_id, username, realm, password),
        )
        .await?;

        let record = with_deadline(
            config.directory_timeout,
            LoginStage::Directory,
            self.lookup(credential.as_ref(), username, realm),
        )
        .await?;

        self.emit(
            self.event(EventType::DirectoryLookup, attempt_id, username, realm)
                .detail("groups", record.member.len().to_string()),
        )
        .await;

        let roles = config.group_map.roles_for(&record.member);
        if roles.is_empty() && !record.member.is_empty() {
            tracing::info!(
                groups = record.member.len(),
                "No directory group of the principal is mapped to a role"
            );
        }

        Ok(AuthenticatedUser {
            username: username.to_string(),
            roles,
            login_time: self.clock.now(),
        })
    }

    /// Verifies the password and proves the credential with a `krbtgt` ticket.
    async fn verify(
        &self,
        attempt_id: Uuid,
        username: &str,
        realm: &Realm,
        password: &SecretString,
    ) -> AuthResult<Box<dyn Credential>> {
        let context = VerifierContext::new(self.clock.clone(), self.random.clone());

        let credential = self
            .verifier
            .verify(username, realm, password, &context)
            .await
            .map_err(|e| {
                tracing::warn!(verifier = self.verifier.id(), error = %e, "Error verifying credentials");
                AuthError::InvalidCredentials(e)
            })?;
        tracing::debug!("Validated credentials");
        self.emit(self.event(EventType::CredentialsVerified, attempt_id, username, realm))
            .await;

        let service = realm.krbtgt_service();
        let ticket = match credential.get_ticket(&service, TicketOptions::default()).await {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::error!(service = %service, error = %e, "Error obtaining ticket");
                return Err(AuthError::TicketDenied { service, source: e });
            }
        };
        tracing::debug!(service = %ticket.service, end_time = ?ticket.end_time, "Obtained ticket");
        self.emit(
            self.event(EventType::TicketIssued, attempt_id, username, realm)
                .detail("service", ticket.service),
        )
        .await;

        Ok(credential)
    }

    /// Reads the principal record through a session bound to `credential`.
    async fn lookup(
        &self,
        credential: &dyn Credential,
        username: &str,
        realm: &Realm,
    ) -> AuthResult<PrincipalRecord> {
        let session = self.directory.open(credential, realm).await.map_err(|e| {
            tracing::error!(directory = self.directory.id(), error = %e, "Error opening directory session");
            AuthError::DirectoryUnavailable(e)
        })?;

        tracing::debug!("Looking up principal in directory");
        let lookup = session.lookup_principal(username, realm).await;
        session.close().await;

        match lookup {
            Ok(Some(record)) => {
                tracing::debug!(dn = %record.distinguished_name, groups = record.member.len(), "Found principal");
                Ok(record)
            }
            Ok(None) => {
                tracing::error!("Principal verified but not found in directory");
                Err(AuthError::DirectoryRecordMissing {
                    username: username.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Error looking up principal in directory");
                Err(AuthError::DirectoryUnavailable(e))
            }
        }
    }

    fn event(&self, event_type: EventType, attempt_id: Uuid, username: &str, realm: &Realm) -> EventBuilder {
        Event::builder(event_type)
            .attempt(attempt_id)
            .username(username)
            .realm(realm.as_str())
    }

    async fn emit(&self, builder: EventBuilder) {
        if let Err(e) = self.events.record(builder.build()).await {
            tracing::warn!(error = %e, "Failed to record audit event");
        }
    }
}

#[async_trait]
impl Authenticator for DirectoryAuthenticator {
    fn id(&self) -> &'static str {
        "directory-authenticator"
    }

    async fn login(&self, username: &str, password: &SecretString) -> AuthResult<AuthenticatedUser> {
        DirectoryAuthenticator::login(self, username, password).await
    }
}

impl fmt::Debug for DirectoryAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryAuthenticator")
            .field("config", &self.config.load())
            .field("verifier", &self.verifier.id())
            .field("directory", &self.directory.id())
            .finish_non_exhaustive()
    }
}

/// Runs a login stage, bounded by `limit` when one is configured.
async fn with_deadline<T, F>(limit: Option<Duration>, stage: LoginStage, stage_future: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, stage_future)
            .await
            .unwrap_or_else(|_| {
                tracing::error!(stage = %stage, limit = ?limit, "Login stage timed out");
                Err(AuthError::Timeout { stage })
            }),
        None => stage_future.await,
    }
}
