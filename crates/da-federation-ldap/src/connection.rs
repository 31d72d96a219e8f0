//! LDAPS connection handling.
//!
//! ## Security Requirements
//!
//! All connections use LDAPS (TLS from connection start).
//! STARTTLS is NOT supported to prevent downgrade attacks.
//!
//! Each directory session owns one connection. Connections are never
//! pooled, since a session's bind identity is tied to a single login.

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings};
use secrecy::ExposeSecret;

use crate::config::{BindMode, LdapConfig};
use crate::error::{LdapError, LdapResult};

/// LDAP result code for a rejected bind.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// An open LDAPS connection.
#[derive(Clone)]
pub struct LdapConnection {
    ldap: Ldap,
}

impl LdapConnection {
    /// Opens a new LDAPS connection.
    ///
    /// ## Security
    ///
    /// The configuration must use LDAPS. This is validated at config build time.
    pub async fn open(config: &LdapConfig) -> LdapResult<Self> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(config.connection_timeout)
            .set_no_tls_verify(!config.validate_certificates);

        // Connect using LDAPS
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &config.connection_url)
            .await
            .map_err(|e| LdapError::connection(e.to_string()))?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Self { ldap })
    }

    /// Binds the connection.
    pub async fn bind(&mut self, bind: &BindMode, config: &LdapConfig) -> LdapResult<()> {
        let result = match bind {
            BindMode::ServiceAccount {
                bind_dn,
                bind_credential,
            } => {
                self.ldap
                    .with_timeout(config.operation_timeout)
                    .simple_bind(bind_dn, bind_credential.expose_secret())
                    .await
            }
            #[cfg(feature = "gssapi")]
            BindMode::Gssapi { server_fqdn } => {
                self.ldap
                    .with_timeout(config.operation_timeout)
                    .sasl_gssapi_bind(server_fqdn)
                    .await
            }
        };

        match result.map_err(|e| LdapError::bind(e.to_string()))?.success() {
            Ok(_) => Ok(()),
            Err(ldap3::LdapError::LdapResult { result }) if result.rc == RC_INVALID_CREDENTIALS => {
                Err(LdapError::bind("invalid bind credentials"))
            }
            Err(e) => Err(LdapError::bind(format!("Bind failed: {e}"))),
        }
    }

    /// Returns a handle for issuing operations.
    #[must_use]
    pub fn handle(&self) -> Ldap {
        self.ldap.clone()
    }

    /// Unbinds and closes the connection.
    pub async fn close(&self) {
        let mut ldap = self.ldap.clone();
        if let Err(e) = ldap.unbind().await {
            tracing::debug!("LDAP unbind failed: {}", e);
        }
    }
}

impl std::fmt::Debug for LdapConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConnection").finish_non_exhaustive()
    }
}
