//! School manager: CRUD guarded by validation and classroom existence
//! checks. Claiming classrooms detaches them from every other school before
//! the write commits, then tells the classroom service to move its
//! back-reference.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use service_core::bus::{BusModule, ExistsReply, RpcBus};
use service_core::error::AppError;
use service_core::ids::{added_and_removed, dedup_ids};

use crate::dtos::SchoolPayload;
use crate::events::ClassroomRef;
use crate::models::School;
use crate::store::SchoolStore;

pub struct SchoolManager {
    store: Arc<dyn SchoolStore>,
    bus: Arc<dyn RpcBus>,
    node_type: String,
}

impl SchoolManager {
    pub fn new(store: Arc<dyn SchoolStore>, bus: Arc<dyn RpcBus>, node_type: &str) -> Self {
        Self {
            store,
            bus,
            node_type: node_type.to_string(),
        }
    }

    pub async fn create_school(&self, payload: SchoolPayload) -> Result<School, AppError> {
        let classrooms = dedup_ids(&payload.classrooms);

        if !classrooms.is_empty() {
            self.ensure_classrooms_exist(&classrooms).await?;
            // Exclusivity: the claimed classrooms leave every other school.
            self.store.detach_classrooms(&classrooms).await?;
        }

        let school = School::new(payload.name, classrooms);
        self.store.insert(&school).await?;
        tracing::info!(school_id = %school.id, "school created");

        if !school.classrooms.is_empty() {
            self.emit("classroom.schoolCreatedEvent", json!(&school)).await;
        }

        Ok(school)
    }

    pub async fn get_schools(&self) -> Result<Vec<School>, AppError> {
        self.store.find_all().await
    }

    pub async fn get_school_by_id(&self, id: &str) -> Result<School, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("School {id} not found")))
    }

    pub async fn update_school(&self, id: &str, payload: SchoolPayload) -> Result<School, AppError> {
        let classrooms = dedup_ids(&payload.classrooms);

        if !classrooms.is_empty() {
            self.ensure_classrooms_exist(&classrooms).await?;
            self.store
                .detach_classrooms_except(&classrooms, id)
                .await?;
        }

        let Some(mut school) = self.store.find_by_id(id).await? else {
            return Err(AppError::not_found("School not found"));
        };
        let old_classrooms = school.classrooms.clone();

        school.name = payload.name;
        school.classrooms = classrooms.clone();
        school.updated_at = chrono::Utc::now();
        self.store.replace(&school).await?;

        let (new_classroom_ids, deleted_classroom_ids) =
            added_and_removed(&old_classrooms, &classrooms);
        if !new_classroom_ids.is_empty() || !deleted_classroom_ids.is_empty() {
            self.emit(
                "classroom.schoolUpdatedEvent",
                json!({
                    "school": &school,
                    "newClassroomIds": &new_classroom_ids,
                    "deletedClassroomIds": &deleted_classroom_ids,
                }),
            )
            .await;
        }

        Ok(school)
    }

    pub async fn delete_school(&self, id: &str) -> Result<(), AppError> {
        let Some(school) = self.store.delete_by_id(id).await? else {
            return Err(AppError::not_found("School not found"));
        };
        tracing::info!(school_id = %school.id, "school deleted");

        if !school.classrooms.is_empty() {
            self.emit("classroom.schoolDeletedEvent", json!(&school)).await;
        }

        Ok(())
    }

    /// Pre-commit referential check against the classroom collection.
    async fn ensure_classrooms_exist(&self, classroom_ids: &[String]) -> Result<(), AppError> {
        let reply = self
            .bus
            .call(
                &self.node_type,
                "classroom.classroomsExistEvent",
                json!({ "classrooms": classroom_ids }),
            )
            .await?;
        let exists: ExistsReply = serde_json::from_value(reply)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("bad existence reply: {e}")))?;
        if exists.ok {
            Ok(())
        } else {
            Err(AppError::Referential {
                message: exists
                    .error
                    .unwrap_or_else(|| "referenced classrooms do not exist".to_string()),
                missing: exists.missing,
            })
        }
    }

    /// Best-effort post-commit notification. Failure is logged, never
    /// surfaced to the caller, and never rolls back the local write.
    async fn emit(&self, function_ref: &str, args: Value) {
        if let Err(err) = self.bus.notify(&self.node_type, function_ref, args).await {
            tracing::warn!(error = %err, call = function_ref, "consistency notification failed");
        }
    }

    async fn classroom_deleted(&self, classroom: ClassroomRef) -> Value {
        if let Err(err) = self.store.remove_classroom_everywhere(&classroom.id).await {
            tracing::error!(error = %err, "failed to apply classroomDeletedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }
}

#[async_trait]
impl BusModule for SchoolManager {
    fn module_name(&self) -> &'static str {
        "school"
    }

    fn exposed(&self) -> &'static [&'static str] {
        &["classroomDeletedEvent"]
    }

    async fn handle(&self, function: &str, args: Value) -> Value {
        match function {
            "classroomDeletedEvent" => match serde_json::from_value(args) {
                Ok(classroom) => self.classroom_deleted(classroom).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            other => json!({ "error": format!("{other} is not executable") }),
        }
    }
}
