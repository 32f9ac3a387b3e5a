//! Operation facade: the seam where the transport dispatcher plugs in.
//! Every operation runs the full authorization pipeline first.

use std::sync::Arc;

use serde_json::{json, Value};

use service_core::envelope::{to_json, ApiResponse};
use service_core::error::AppError;
use service_core::pipeline::{ApiRequest, AuthPipeline};
use service_core::validation::{parse_valid, require_id};

use crate::services::StudentManager;

pub struct StudentApi {
    manager: Arc<StudentManager>,
    pipeline: Arc<AuthPipeline>,
}

impl StudentApi {
    pub fn new(manager: Arc<StudentManager>, pipeline: Arc<AuthPipeline>) -> Self {
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
            "create_student" => {
                to_json(self.manager.create_student(parse_valid(req.body)?).await?)
            }
            "get_students" => to_json(self.manager.get_students().await?),
            "get_student_by_id" => {
                let id = require_id(req.param("id"))?;
                to_json(self.manager.get_student_by_id(&id).await?)
            }
            "update_student" => {
                let id = require_id(req.param("id"))?;
                to_json(self.manager.update_student(&id, parse_valid(req.body)?).await?)
            }
            "delete_student" => {
                let id = require_id(req.param("id"))?;
                self.manager.delete_student(&id).await?;
                Ok(json!({ "message": "Student deleted successfully" }))
            }
            other => Err(AppError::not_found(format!("unknown operation {other}"))),
        }
    }
}
