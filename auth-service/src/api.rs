//! Operation facade: the seam where the transport dispatcher plugs in.
//!
//! Account creation and login are public; short-token minting requires a
//! long token plus a device header; everything else goes through the
//! authorization pipeline. The auth module registers no field policy, so the
//! permission stage passes it through.

use std::sync::Arc;

use serde_json::{json, Value};

use service_core::envelope::{to_json, ApiResponse};
use service_core::error::AppError;
use service_core::pipeline::{ApiRequest, AuthPipeline};
use service_core::validation::{parse_valid, require_id};

use crate::services::{AuthManager, TokenService};

pub struct AuthApi {
    manager: Arc<AuthManager>,
    tokens: Arc<TokenService>,
    pipeline: Arc<AuthPipeline>,
}

impl AuthApi {
    pub fn new(
        manager: Arc<AuthManager>,
        tokens: Arc<TokenService>,
        pipeline: Arc<AuthPipeline>,
    ) -> Self {
        Self {
            manager,
            tokens,
            pipeline,
        }
    }

    pub async fn handle(&self, req: ApiRequest) -> ApiResponse {
        match self.dispatch(req).await {
            Ok(data) => ApiResponse::success(data),
            Err(err) => err.into(),
        }
    }

    async fn dispatch(&self, req: ApiRequest) -> Result<Value, AppError> {
        match req.operation.as_str() {
            "create_user" => to_json(self.manager.create_user(parse_valid(req.body)?).await?),
            "login" => to_json(self.manager.login(parse_valid(req.body)?).await?),
            "create_short_token" => {
                let token = req.token.as_deref().ok_or(AppError::Unauthorized)?;
                let device = req.device.as_deref().ok_or(AppError::Unauthorized)?;
                let claims = self
                    .tokens
                    .verify_long_token(token)
                    .map_err(|_| AppError::Unauthorized)?;
                let short = self
                    .manager
                    .create_short_token(&claims.user_id, device)
                    .await?;
                Ok(Value::String(short))
            }
            "get_users" => {
                self.pipeline.authorize(&req).await?;
                to_json(self.manager.get_users().await?)
            }
            "delete_user" => {
                self.pipeline.authorize(&req).await?;
                let id = require_id(req.param("id"))?;
                self.manager.delete_user(&id).await?;
                Ok(json!({ "message": "User deleted successfully" }))
            }
            other => Err(AppError::not_found(format!("unknown operation {other}"))),
        }
    }
}
