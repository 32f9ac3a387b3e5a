//! Operation facade: the seam where the transport dispatcher plugs in.
//! Every operation runs the full authorization pipeline first.

use std::sync::Arc;

use serde_json::{json, Value};

use service_core::envelope::{to_json, ApiResponse};
use service_core::error::AppError;
use service_core::pipeline::{ApiRequest, AuthPipeline};
use service_core::validation::{parse_valid, require_id};

use crate::services::SchoolManager;

pub struct SchoolApi {
    manager: Arc<SchoolManager>,
    pipeline: Arc<AuthPipeline>,
}

impl SchoolApi {
    pub fn new(manager: Arc<SchoolManager>, pipeline: Arc<AuthPipeline>) -> Self {
        Self { manager, pipeline }
    }

    pub async fn handle(&self, req: ApiRequest) -> ApiResponse {
        match self.dispatch(req).await {
            Ok(data) => ApiResponse::success(data),
            Err(err) => err.into(),
        }
    }

    async fn dispatch(&self, req: ApiRequest) -> Result<Value, AppError> {
        self.pipeline.authorize(&req).await?;

        match req.operation.as_str() {
            "create_school" => to_json(self.manager.create_school(parse_valid(req.body)?).await?),
            "get_schools" => to_json(self.manager.get_schools().await?),
            "get_school_by_id" => {
                let id = require_id(req.param("id"))?;
                to_json(self.manager.get_school_by_id(&id).await?)
            }
            "update_school" => {
                let id = require_id(req.param("id"))?;
                to_json(self.manager.update_school(&id, parse_valid(req.body)?).await?)
            }
            "delete_school" => {
                let id = require_id(req.param("id"))?;
                self.manager.delete_school(&id).await?;
                Ok(json!({ "message": "School deleted successfully" }))
            }
            other => Err(AppError::not_found(format!("unknown operation {other}"))),
        }
    }
}
