//! Authenticated user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a successful login.
///
/// Built fresh for every login and handed to the caller. Session expiry is
/// the session store's concern; this record only carries the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Username as supplied by the caller.
    pub username: String,

    /// Internal roles, in directory group order. May contain duplicates.
    pub roles: Vec<String>,

    /// Time the directory lookup completed.
    pub login_time: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Checks if the user holds a role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
