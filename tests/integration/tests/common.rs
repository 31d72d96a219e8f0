//! Common test utilities and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use da_auth::{
    AuthenticatorConfig, Credential, CredentialVerifier, DirectoryAuthenticator, DirectoryError,
    DirectoryResolver, DirectorySession, PrincipalRecord, Realm, ServiceTicket, TicketOptions,
    VerifierContext, VerifierError,
};
use da_core::event::InMemoryEventSink;
use secrecy::{ExposeSecret, SecretString};

/// Wraps a test password.
pub fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

// ============================================================================
// Realm
// ============================================================================

/// In-process realm authentication service.
#[derive(Default)]
pub struct FakeRealm {
    passwords: Mutex<HashMap<String, String>>,
    pub unreachable: AtomicBool,
    pub deny_tickets: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub verify_calls: AtomicUsize,
    realms_seen: Mutex<Vec<Realm>>,
    contexts_seen: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeRealm {
    /// Adds a principal.
    pub fn add_principal(&self, username: &str, password: &str) {
        self.passwords
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
    }

    /// Delays every verification.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Realms passed to the verifier, in call order.
    pub fn realms_seen(&self) -> Vec<Realm> {
        self.realms_seen.lock().unwrap().clone()
    }

    /// Creation times of the contexts passed to the verifier.
    pub fn contexts_seen(&self) -> Vec<DateTime<Utc>> {
        self.contexts_seen.lock().unwrap().clone()
    }
}

pub struct FakeCredential {
    principal: String,
    realm: Realm,
    deny_tickets: bool,
}

#[async_trait]
impl Credential for FakeCredential {
    fn principal(&self) -> &str {
        &self.principal
    }

    fn realm(&self) -> &Realm {
        &self.realm
    }

    async fn get_ticket(
        &self,
        service: &str,
        _options: TicketOptions,
    ) -> Result<ServiceTicket, VerifierError> {
        if self.deny_tickets {
            return Err(VerifierError::policy("account disabled"));
        }
        Ok(ServiceTicket::new(service, &self.principal, self.realm.clone(), Utc::now()))
    }
}

#[async_trait]
impl CredentialVerifier for FakeRealm {
    fn id(&self) -> &'static str {
        "fake-realm"
    }

    async fn verify(
        &self,
        username: &str,
        realm: &Realm,
        password: &SecretString,
        context: &VerifierContext,
    ) -> Result<Box<dyn Credential>, VerifierError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.realms_seen.lock().unwrap().push(realm.clone());
        self.contexts_seen.lock().unwrap().push(context.created_at());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(VerifierError::unreachable("no KDC for realm"));
        }

        let expected = self.passwords.lock().unwrap().get(username).cloned();
        match expected {
            None => Err(VerifierError::PrincipalUnknown),
            Some(expected) if expected != password.expose_secret() => Err(VerifierError::PreauthFailed),
            Some(_) => Ok(Box::new(FakeCredential {
                principal: username.to_string(),
                realm: realm.clone(),
                deny_tickets: self.deny_tickets.load(Ordering::SeqCst),
            })),
        }
    }
}

// ============================================================================
// Directory
// ============================================================================

/// In-process directory.
#[derive(Default)]
pub struct FakeDirectory {
    records: Mutex<HashMap<String, PrincipalRecord>>,
    pub refuse_sessions: AtomicBool,
    pub fail_lookups: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl FakeDirectory {
    /// Adds a principal with the given group memberships.
    pub fn add_record(&self, username: &str, member: &[&str]) {
        let record = PrincipalRecord::new(
            format!("CN={username},OU=Users,DC=example,DC=com"),
            member.iter().copied(),
        );
        self.records
            .lock()
            .unwrap()
            .insert(username.to_string(), record);
    }

    /// Delays every lookup.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

struct FakeSession {
    records: HashMap<String, PrincipalRecord>,
    fail: bool,
    delay: Option<Duration>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl DirectorySession for FakeSession {
    async fn lookup_principal(
        &self,
        username: &str,
        _realm: &Realm,
    ) -> Result<Option<PrincipalRecord>, DirectoryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DirectoryError::search("server busy"));
        }
        Ok(self.records.get(username).cloned())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryResolver for FakeDirectory {
    fn id(&self) -> &'static str {
        "fake-directory"
    }

    async fn open(
        &self,
        credential: &dyn Credential,
        realm: &Realm,
    ) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.refuse_sessions.load(Ordering::SeqCst) {
            return Err(DirectoryError::connection("connection refused"));
        }
        if credential.realm() != realm {
            return Err(DirectoryError::bind("realm mismatch"));
        }

        Ok(Box::new(FakeSession {
            records: self.records.lock().unwrap().clone(),
            fail: self.fail_lookups.load(Ordering::SeqCst),
            delay: *self.delay.lock().unwrap(),
            closes: Arc::clone(&self.closes),
        }))
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Test environment wiring an authenticator to the fakes.
pub struct TestEnv {
    pub realm: Arc<FakeRealm>,
    pub directory: Arc<FakeDirectory>,
    pub events: InMemoryEventSink,
    pub authenticator: DirectoryAuthenticator,
}

impl TestEnv {
    /// Creates an environment with one principal, `jdoe`/`s3cret`, who is
    /// a member of Admins and Users.
    pub fn new(config: AuthenticatorConfig) -> Self {
        let _ = da_core::telemetry::init_tracing("da_auth=debug");

        let realm = Arc::new(FakeRealm::default());
        realm.add_principal("jdoe", "s3cret");

        let directory = Arc::new(FakeDirectory::default());
        directory.add_record("jdoe", &["CN=Admins,DC=x", "CN=Users,DC=x"]);

        let events = InMemoryEventSink::new();
        let authenticator = DirectoryAuthenticator::new(
            config,
            Arc::clone(&realm) as Arc<dyn CredentialVerifier>,
            Arc::clone(&directory) as Arc<dyn DirectoryResolver>,
        )
        .with_event_sink(Arc::new(events.clone()));

        Self {
            realm,
            directory,
            events,
            authenticator,
        }
    }

    /// Environment for `EXAMPLE.COM` mapping Admins to `admin`.
    pub fn with_admin_map() -> Self {
        let env = Self::new(AuthenticatorConfig::new("example.com"));
        env.authenticator
            .setup(HashMap::from([("CN=Admins,DC=x".to_string(), "admin".to_string())]));
        env
    }
}
