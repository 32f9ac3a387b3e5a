//! Request bodies and their validation rule sets.

use serde::Deserialize;
use service_core::permissions::Role;
use service_core::validation::{validate_password, USERNAME_RE};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 20),
        regex(path = *USERNAME_RE, message = "can only contain lowercase letters and underscores")
    )]
    pub username: String,
    #[validate(length(min = 8, max = 20), custom(function = validate_password))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        length(min = 3, max = 20),
        regex(path = *USERNAME_RE, message = "can only contain lowercase letters and underscores")
    )]
    pub username: String,
    #[validate(length(min = 8, max = 20))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_uppercase_username() {
        let req = CreateUserRequest {
            username: "Admin".to_string(),
            password: "p@ssW0rD".to_string(),
            role: Role::SuperAdmin,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_weak_password() {
        let req = CreateUserRequest {
            username: "head_admin".to_string(),
            password: "password".to_string(),
            role: Role::SuperAdmin,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_account() {
        let req = CreateUserRequest {
            username: "head_admin".to_string(),
            password: "p@ssW0rD".to_string(),
            role: Role::SchoolAdmin,
        };
        assert!(req.validate().is_ok());
    }
}
