//! Authenticator settings.
//!
//! Settings are read from a TOML file and may be overridden from the
//! environment:
//!
//! ```toml
//! realm = "example.com"
//!
//! [group_map]
//! "CN=Admins,DC=example,DC=com" = "admin"
//! "CN=Operators,DC=example,DC=com" = "operator"
//!
//! [login]
//! verify_timeout_secs = 10
//! directory_timeout_secs = 5
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the realm.
pub const ENV_REALM: &str = "DIRAUTH_REALM";
/// Environment variable overriding the verification timeout.
pub const ENV_VERIFY_TIMEOUT: &str = "DIRAUTH_VERIFY_TIMEOUT_SECS";
/// Environment variable overriding the directory timeout.
pub const ENV_DIRECTORY_TIMEOUT: &str = "DIRAUTH_DIRECTORY_TIMEOUT_SECS";

/// Top-level settings for the directory authenticator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Authentication realm, in any case.
    #[serde(default)]
    pub realm: String,

    /// Directory group identifier to internal role.
    #[serde(default)]
    pub group_map: BTreeMap<String, String>,

    /// Login stage limits.
    #[serde(default)]
    pub login: LoginSettings,
}

/// Per-stage deadlines for a login.
///
/// Absent values mean the stage is not bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSettings {
    /// Deadline for credential verification and ticket issuance.
    pub verify_timeout_secs: Option<u64>,

    /// Deadline for opening the directory session and looking up the principal.
    pub directory_timeout_secs: Option<u64>,
}

impl LoginSettings {
    /// Returns the verification deadline.
    #[must_use]
    pub fn verify_timeout(&self) -> Option<Duration> {
        self.verify_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the directory deadline.
    #[must_use]
    pub fn directory_timeout(&self) -> Option<Duration> {
        self.directory_timeout_secs.map(Duration::from_secs)
    }
}

impl Settings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("failed to parse settings: {e}")))
    }

    /// Loads settings from a file, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;

        tracing::debug!(
            path = %path.as_ref().display(),
            realm = %settings.realm,
            groups = settings.group_map.len(),
            "Loaded authenticator settings"
        );

        Ok(settings)
    }

    /// Applies overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(realm) = lookup(ENV_REALM) {
            self.realm = realm;
        }

        if let Some(value) = lookup(ENV_VERIFY_TIMEOUT) {
            self.login.verify_timeout_secs = Some(parse_secs(ENV_VERIFY_TIMEOUT, &value)?);
        }

        if let Some(value) = lookup(ENV_DIRECTORY_TIMEOUT) {
            self.login.directory_timeout_secs = Some(parse_secs(ENV_DIRECTORY_TIMEOUT, &value)?);
        }

        Ok(())
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.realm.trim().is_empty() {
            return Err(Error::validation("realm cannot be empty"));
        }

        if self.login.verify_timeout_secs == Some(0) || self.login.directory_timeout_secs == Some(0) {
            return Err(Error::validation("login timeouts must be greater than zero"));
        }

        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{key} must be a whole number of seconds, got {value:?}")))
}
