//! User model - accounts owned by the auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::ids::new_id;
use service_core::permissions::Role;

/// User entity as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 hash. Never leaves the service: outward-facing paths go
    /// through `sanitized()`.
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            username,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert to a response without sensitive fields.
    pub fn sanitized(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User as exposed to callers and peer services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account creation / login result: the user plus a fresh long token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub long_token: String,
}
