use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity resolved from a bearer credential. The subject is an opaque
/// citizen identifier; core performs no further validation on it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Administrators drive report lifecycle transitions.
    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}
