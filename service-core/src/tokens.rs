//! Token claim contracts shared by the issuer (auth-service) and the
//! authorization pipeline.
//!
//! Only auth-service holds signing material; every other service sees claims
//! as data, decoded for it over the bus.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims of the long-lived identity token. Its sole purpose is minting short
/// tokens; it never authorizes an ordinary operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTokenClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of the short-lived session token carried on every authorized call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortTokenClaims {
    pub user_id: String,
    pub session_id: String,
    pub device_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Local short-token verification seam.
///
/// Implemented only by the auth process; peers go through
/// `auth.verifyShortTokenEvent` instead.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_short_token(&self, token: &str) -> Result<ShortTokenClaims, AppError>;
}
