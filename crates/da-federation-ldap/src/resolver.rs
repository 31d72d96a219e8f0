//! LDAP directory resolver.

use std::sync::Arc;

use async_trait::async_trait;
use da_auth::{Credential, DirectoryError, DirectoryResolver, DirectorySession, PrincipalRecord, Realm};

use crate::config::LdapConfig;
use crate::connection::LdapConnection;
use crate::error::{LdapError, LdapResult};
use crate::search::PrincipalSearcher;

/// Opens LDAPS directory sessions for verified credentials.
#[derive(Debug, Clone)]
pub struct LdapDirectoryResolver {
    config: Arc<LdapConfig>,
}

impl LdapDirectoryResolver {
    /// Creates a resolver.
    ///
    /// ## Security
    ///
    /// Validates the configuration, rejecting non-LDAPS URLs.
    pub fn new(config: LdapConfig) -> LdapResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    async fn connect(&self, credential: &dyn Credential, realm: &Realm) -> LdapResult<LdapDirectorySession> {
        check_realm(credential, realm)?;

        let mut connection = LdapConnection::open(&self.config).await?;
        if let Err(e) = connection.bind(&self.config.bind, &self.config).await {
            connection.close().await;
            return Err(e);
        }

        tracing::debug!(
            url = %self.config.connection_url,
            principal = credential.principal(),
            "LDAP session opened"
        );

        Ok(LdapDirectorySession {
            connection,
            config: Arc::clone(&self.config),
            principal: credential.principal().to_string(),
        })
    }
}

// The bind identity is not the user's, so the credential's realm and
// principal are what tie a session to the login that opened it.
fn check_realm(credential: &dyn Credential, realm: &Realm) -> LdapResult<()> {
    if credential.realm() != realm {
        return Err(LdapError::RealmMismatch {
            credential: credential.realm().to_string(),
            requested: realm.to_string(),
        });
    }
    Ok(())
}

/// Checks that `username` names the session's principal. A principal may
/// carry an `@REALM` suffix; names compare case-insensitively.
fn check_principal(principal: &str, username: &str) -> LdapResult<()> {
    let local = |name: &str| name.split_once('@').map_or(name, |(n, _)| n).to_string();

    if !local(principal).eq_ignore_ascii_case(&local(username)) {
        return Err(LdapError::PrincipalMismatch {
            credential: principal.to_string(),
            requested: username.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl DirectoryResolver for LdapDirectoryResolver {
    fn id(&self) -> &'static str {
        "ldap"
    }

    async fn open(
        &self,
        credential: &dyn Credential,
        realm: &Realm,
    ) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        let session = self.connect(credential, realm).await?;
        Ok(Box::new(session))
    }
}

/// A bound LDAPS session.
///
/// Only the principal of the credential that opened the session can be
/// looked up.
#[derive(Debug)]
pub struct LdapDirectorySession {
    connection: LdapConnection,
    config: Arc<LdapConfig>,
    principal: String,
}

#[async_trait]
impl DirectorySession for LdapDirectorySession {
    async fn lookup_principal(
        &self,
        username: &str,
        realm: &Realm,
    ) -> Result<Option<PrincipalRecord>, DirectoryError> {
        if let Err(e) = check_principal(&self.principal, username) {
            tracing::warn!(principal = %self.principal, username, "Refused lookup for another principal");
            return Err(e.into());
        }

        let base_dn = self.config.base_dn_for(realm);
        let mut searcher = PrincipalSearcher::new(self.connection.handle(), &self.config);

        let record = searcher
            .find_principal(&base_dn, username)
            .await?
            .map(|entry| entry.to_principal_record(&self.config));

        Ok(record)
    }

    async fn close(&self) {
        self.connection.close().await;
    }
}
