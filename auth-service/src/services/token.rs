//! Two-tier token service.
//!
//! The long token authenticates identity for the sole purpose of minting
//! short tokens; the short token authorizes ordinary operations and carries
//! session/device context. Each class is signed with its own HS256 secret.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use service_core::error::AppError;
use service_core::tokens::{LongTokenClaims, ShortTokenClaims, TokenVerifier};

use crate::config::TokenConfig;

#[derive(Clone)]
pub struct TokenService {
    long_encoding: EncodingKey,
    long_decoding: DecodingKey,
    short_encoding: EncodingKey,
    short_decoding: DecodingKey,
    long_expiry_days: i64,
    short_expiry_days: i64,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            long_encoding: EncodingKey::from_secret(config.long_secret.as_bytes()),
            long_decoding: DecodingKey::from_secret(config.long_secret.as_bytes()),
            short_encoding: EncodingKey::from_secret(config.short_secret.as_bytes()),
            short_decoding: DecodingKey::from_secret(config.short_secret.as_bytes()),
            long_expiry_days: config.long_expiry_days,
            short_expiry_days: config.short_expiry_days,
        }
    }

    /// Issue the long-lived identity token handed out at account creation
    /// and login.
    pub fn issue_long_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = LongTokenClaims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.long_expiry_days)).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.long_encoding,
        )?)
    }

    /// Issue a short token for an already-verified identity.
    pub fn issue_short_token(
        &self,
        user_id: &str,
        session_id: &str,
        device_id: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = ShortTokenClaims {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            device_id: device_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.short_expiry_days)).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.short_encoding,
        )?)
    }

    /// Mint a short token with a fresh session id and the device fingerprint.
    pub fn mint_short_token(&self, user_id: &str, device: &str) -> Result<String, AppError> {
        self.issue_short_token(
            user_id,
            &Uuid::new_v4().to_string(),
            &device_fingerprint(device),
        )
    }

    pub fn verify_long_token(&self, token: &str) -> Result<LongTokenClaims, AppError> {
        let data = decode::<LongTokenClaims>(
            token,
            &self.long_decoding,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    pub fn verify_short_token_claims(&self, token: &str) -> Result<ShortTokenClaims, AppError> {
        let data = decode::<ShortTokenClaims>(
            token,
            &self.short_decoding,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenVerifier for TokenService {
    async fn verify_short_token(&self, token: &str) -> Result<ShortTokenClaims, AppError> {
        // Expired, malformed and tampered all collapse to one outcome.
        self.verify_short_token_claims(token)
            .map_err(|_| AppError::Unauthorized)
    }
}

/// Deterministic fingerprint of an opaque device identifier.
pub fn device_fingerprint(device: &str) -> String {
    hex::encode(Sha256::digest(device.as_bytes()))
}
