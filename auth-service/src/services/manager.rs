//! Auth manager: account operations plus the bus handlers peer services
//! depend on for token verification and role lookups.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use service_core::bus::BusModule;
use service_core::error::AppError;

use crate::dtos::{CreateUserRequest, LoginRequest};
use crate::models::{AuthResponse, User, UserResponse};
use crate::services::TokenService;
use crate::store::UserStore;
use crate::utils::password::{hash_password, verify_password};

pub struct AuthManager {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

impl AuthManager {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> Result<AuthResponse, AppError> {
        if self.store.count_username(&req.username).await? > 0 {
            return Err(AppError::conflict("Username already exists"));
        }

        let user = User::new(req.username, hash_password(&req.password)?, req.role);
        self.store.insert(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");

        let long_token = self.tokens.issue_long_token(&user.id)?;
        Ok(AuthResponse {
            user: user.sanitized(),
            long_token,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        // Unknown user and bad password are indistinguishable to the caller.
        let Some(user) = self.store.find_by_username(&req.username).await? else {
            return Err(AppError::bad_request("Invalid credentials"));
        };
        if !verify_password(&req.password, &user.password_hash) {
            return Err(AppError::bad_request("Invalid credentials"));
        }

        let long_token = self.tokens.issue_long_token(&user.id)?;
        Ok(AuthResponse {
            user: user.sanitized(),
            long_token,
        })
    }

    pub async fn create_short_token(
        &self,
        user_id: &str,
        device: &str,
    ) -> Result<String, AppError> {
        self.tokens.mint_short_token(user_id, device)
    }

    pub async fn get_users(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = self.store.find_all().await?;
        Ok(users.iter().map(User::sanitized).collect())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        match self.store.delete_by_id(id).await? {
            Some(user) => {
                tracing::info!(user_id = %user.id, "user deleted");
                Ok(())
            }
            None => Err(AppError::not_found("User not found")),
        }
    }
}

#[async_trait]
impl BusModule for AuthManager {
    fn module_name(&self) -> &'static str {
        "auth"
    }

    fn exposed(&self) -> &'static [&'static str] {
        &["verifyShortTokenEvent", "findUserByIdEvent"]
    }

    async fn handle(&self, function: &str, args: Value) -> Value {
        match function {
            "verifyShortTokenEvent" => {
                let Some(token) = args.get("token").and_then(Value::as_str) else {
                    return Value::Null;
                };
                match self.tokens.verify_short_token_claims(token) {
                    Ok(claims) => serde_json::to_value(claims).unwrap_or(Value::Null),
                    Err(_) => Value::Null,
                }
            }
            "findUserByIdEvent" => {
                let Some(id) = args.get("id").and_then(Value::as_str) else {
                    return Value::Null;
                };
                match self.store.find_by_id(id).await {
                    Ok(Some(user)) => serde_json::to_value(user.sanitized()).unwrap_or(Value::Null),
                    Ok(None) => Value::Null,
                    Err(err) => {
                        tracing::error!(error = %err, "user lookup failed");
                        json!({ "error": "user lookup failed" })
                    }
                }
            }
            other => json!({ "error": format!("{other} is not executable") }),
        }
    }
}
