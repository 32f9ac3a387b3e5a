//! Ordered per-request authorization pipeline: token stage, permission
//! stage, then the handler.
//!
//! Each stage either advances with a named result or terminates the request.
//! Bus failures never fall through to success: the token stage fails closed
//! to Unauthorized, the permission stage to Forbidden.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Map, Value};

use crate::bus::RpcBus;
use crate::error::AppError;
use crate::permissions::{FieldPolicy, PermissionEngine, Role};
use crate::tokens::{ShortTokenClaims, TokenVerifier};

/// HTTP-style verb the calling surface resolved for the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

/// One inbound request as seen by a service's operation facade.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub module: String,
    pub operation: String,
    pub verb: Verb,
    /// Opaque credential header.
    pub token: Option<String>,
    /// Device identifier header, used only when minting short tokens.
    pub device: Option<String>,
    pub params: HashMap<String, String>,
    pub body: Value,
}

impl ApiRequest {
    pub fn new(module: &str, operation: &str, verb: Verb) -> Self {
        Self {
            module: module.to_string(),
            operation: operation.to_string(),
            verb,
            token: None,
            device: None,
            params: HashMap::new(),
            body: Value::Object(Map::new()),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Context injected into the handler once both stages advanced.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: ShortTokenClaims,
}

pub struct AuthPipeline {
    bus: Arc<dyn RpcBus>,
    node_type: String,
    engine: Arc<PermissionEngine>,
    field_policies: HashMap<String, FieldPolicy>,
    /// Present only in the auth process, which self-verifies.
    local_verifier: Option<Arc<dyn TokenVerifier>>,
}

impl AuthPipeline {
    pub fn new(
        bus: Arc<dyn RpcBus>,
        node_type: &str,
        engine: Arc<PermissionEngine>,
        field_policies: HashMap<String, FieldPolicy>,
    ) -> Self {
        Self {
            bus,
            node_type: node_type.to_string(),
            engine,
            field_policies,
            local_verifier: None,
        }
    }

    pub fn with_local_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.local_verifier = Some(verifier);
        self
    }

    /// Run both stages; the handler may only be invoked on `Ok`.
    pub async fn authorize(&self, req: &ApiRequest) -> Result<AuthContext, AppError> {
        let claims = self.token_stage(req).await?;
        self.permission_stage(req, &claims).await?;
        Ok(AuthContext { claims })
    }

    /// Stage 1: a credential header is required; only the auth module may
    /// self-verify, everyone else asks auth over the bus.
    async fn token_stage(&self, req: &ApiRequest) -> Result<ShortTokenClaims, AppError> {
        let Some(token) = req.token.as_deref() else {
            tracing::debug!(module = %req.module, "token required but not found");
            return Err(AppError::Unauthorized);
        };

        if req.module == "auth" {
            let Some(verifier) = &self.local_verifier else {
                return Err(AppError::Unauthorized);
            };
            return verifier
                .verify_short_token(token)
                .await
                .map_err(|_| AppError::Unauthorized);
        }

        let reply = self
            .bus
            .call(
                &self.node_type,
                "auth.verifyShortTokenEvent",
                json!({ "token": token }),
            )
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "token verification call failed");
                AppError::Unauthorized
            })?;
        decode_claims(reply).ok_or(AppError::Unauthorized)
    }

    /// Stage 2: modules without a registered field policy pass through
    /// unchecked; configured modules gate on the caller's role.
    async fn permission_stage(
        &self,
        req: &ApiRequest,
        claims: &ShortTokenClaims,
    ) -> Result<(), AppError> {
        let Some(policy) = self.field_policies.get(&req.module) else {
            return Ok(());
        };

        let user = self
            .bus
            .call(
                &self.node_type,
                "auth.findUserByIdEvent",
                json!({ "id": &claims.user_id }),
            )
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "role lookup call failed");
                AppError::Forbidden
            })?;
        let role = user
            .get("role")
            .and_then(Value::as_str)
            .and_then(|r| Role::from_str(r).ok())
            .ok_or(AppError::Forbidden)?;

        let granted = match req.verb {
            Verb::Get => self
                .engine
                .is_granted(&req.module, role.as_str(), "read", false),
            // DELETE gates on "create", exactly as the source policy table
            // has it.
            Verb::Delete => self
                .engine
                .is_granted(&req.module, role.as_str(), "create", false),
            Verb::Post | Verb::Put => {
                let layers: Vec<&String> = req
                    .body
                    .as_object()
                    .map(|fields| {
                        fields
                            .keys()
                            .filter_map(|field| policy.get(field))
                            .collect()
                    })
                    .unwrap_or_default();
                let checks = layers.into_iter().map(|layer| async move {
                    self.engine.is_granted(layer, role.as_str(), "create", false)
                });
                join_all(checks).await.into_iter().all(|granted| granted)
            }
        };

        if granted {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn decode_claims(reply: Value) -> Option<ShortTokenClaims> {
    if reply.is_null() || reply.get("error").is_some() {
        return None;
    }
    serde_json::from_value(reply).ok()
}
