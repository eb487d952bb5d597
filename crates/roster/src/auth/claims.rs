//! JWT claims.

use serde::{Deserialize, Serialize};

use crate::user::UserRole;

/// JWT claims carried by access tokens.
///
/// `role` is the role name string so tokens stay readable to other services;
/// [`Claims::role`] parses it back into the closed enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// User's email.
    pub email: String,

    /// Role name (`ADMIN`, `MANAGER`, ...).
    pub role: String,

    /// Issued at (as Unix timestamp).
    pub iat: i64,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Parse the role claim. Unknown values degrade to `Anonymous` rather
    /// than erroring, so a stale token never grants elevated access.
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Anonymous)
    }

    /// Whether the token grants user-management access.
    pub fn is_elevated(&self) -> bool {
        self.role().is_elevated()
    }
}
