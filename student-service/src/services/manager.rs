//! Student manager: CRUD guarded by validation and peer existence checks,
//! plus the consistency handlers the classroom service invokes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};

use service_core::bus::{BusModule, ExistsReply, RpcBus};
use service_core::error::AppError;
use service_core::ids::{added_and_removed, dedup_ids};

use crate::dtos::StudentPayload;
use crate::events::{ClassroomRef, ClassroomUpdated, StudentsExist};
use crate::models::Student;
use crate::store::StudentStore;

pub struct StudentManager {
    store: Arc<dyn StudentStore>,
    bus: Arc<dyn RpcBus>,
    node_type: String,
}

impl StudentManager {
    pub fn new(store: Arc<dyn StudentStore>, bus: Arc<dyn RpcBus>, node_type: &str) -> Self {
        Self {
            store,
            bus,
            node_type: node_type.to_string(),
        }
    }

    pub async fn create_student(&self, payload: StudentPayload) -> Result<Student, AppError> {
        let classrooms = dedup_ids(&payload.classrooms);

        if !classrooms.is_empty() {
            self.ensure_classrooms_exist(&classrooms).await?;
        }

        let student = Student::new(payload.name, classrooms);
        self.store.insert(&student).await?;
        tracing::info!(student_id = %student.id, "student created");

        if !student.classrooms.is_empty() {
            self.emit("classroom.studentCreatedEvent", json!(&student)).await;
        }

        Ok(student)
    }

    pub async fn get_students(&self) -> Result<Vec<Student>, AppError> {
        self.store.find_all().await
    }

    pub async fn get_student_by_id(&self, id: &str) -> Result<Student, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Student {id} not found")))
    }

    pub async fn update_student(
        &self,
        id: &str,
        payload: StudentPayload,
    ) -> Result<Student, AppError> {
        let classrooms = dedup_ids(&payload.classrooms);

        if !classrooms.is_empty() {
            self.ensure_classrooms_exist(&classrooms).await?;
        }

        let Some(mut student) = self.store.find_by_id(id).await? else {
            return Err(AppError::not_found("Student not found"));
        };
        let old_classrooms = student.classrooms.clone();

        student.name = payload.name;
        student.classrooms = classrooms.clone();
        student.updated_at = chrono::Utc::now();
        self.store.replace(&student).await?;

        let (new_classroom_ids, deleted_classroom_ids) =
            added_and_removed(&old_classrooms, &classrooms);
        if !new_classroom_ids.is_empty() || !deleted_classroom_ids.is_empty() {
            self.emit(
                "classroom.studentUpdatedEvent",
                json!({
                    "student": &student,
                    "newClassroomIds": &new_classroom_ids,
                    "deletedClassroomIds": &deleted_classroom_ids,
                }),
            )
            .await;
        }

        Ok(student)
    }

    pub async fn delete_student(&self, id: &str) -> Result<(), AppError> {
        let Some(student) = self.store.delete_by_id(id).await? else {
            return Err(AppError::not_found("Student not found"));
        };
        tracing::info!(student_id = %student.id, "student deleted");

        if !student.classrooms.is_empty() {
            self.emit("classroom.studentRemovedEvent", json!(&student)).await;
        }

        Ok(())
    }

    /// Pre-commit referential check: every referenced classroom must exist
    /// right now in the peer collection. Race-prone by design.
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

    async fn students_exist(&self, req: StudentsExist) -> Value {
        let checks = req.students.iter().map(|id| self.store.count_by_id(id));
        let counts = join_all(checks).await;

        let mut missing = Vec::new();
        for (id, count) in req.students.iter().zip(counts) {
            match count {
                Ok(0) => missing.push(id.clone()),
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "existence check failed");
                    return json!({ "error": "existence check failed" });
                }
            }
        }

        let reply = if missing.is_empty() {
            ExistsReply::all_present()
        } else {
            ExistsReply::some_missing("Students", missing)
        };
        json!(reply)
    }

    async fn classroom_created(&self, classroom: ClassroomRef) -> Value {
        if let Err(err) = self
            .store
            .add_classroom(&classroom.students, &classroom.id)
            .await
        {
            tracing::error!(error = %err, "failed to apply classroomCreatedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }

    async fn classroom_deleted(&self, classroom: ClassroomRef) -> Value {
        if let Err(err) = self
            .store
            .remove_classroom(&classroom.students, &classroom.id)
            .await
        {
            tracing::error!(error = %err, "failed to apply classroomDeletedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }

    async fn classroom_updated(&self, update: ClassroomUpdated) -> Value {
        if !update.new_student_ids.is_empty() {
            if let Err(err) = self
                .store
                .add_classroom(&update.new_student_ids, &update.classroom.id)
                .await
            {
                tracing::error!(error = %err, "failed to apply classroomUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        if !update.deleted_student_ids.is_empty() {
            if let Err(err) = self
                .store
                .remove_classroom(&update.deleted_student_ids, &update.classroom.id)
                .await
            {
                tracing::error!(error = %err, "failed to apply classroomUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        json!({ "ok": true })
    }
}

#[async_trait]
impl BusModule for StudentManager {
    fn module_name(&self) -> &'static str {
        "student"
    }

    fn exposed(&self) -> &'static [&'static str] {
        &[
            "studentsExistEvent",
            "classroomCreatedEvent",
            "classroomDeletedEvent",
            "classroomUpdatedEvent",
        ]
    }

    async fn handle(&self, function: &str, args: Value) -> Value {
        match function {
            "studentsExistEvent" => match serde_json::from_value(args) {
                Ok(req) => self.students_exist(req).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "classroomCreatedEvent" => match serde_json::from_value(args) {
                Ok(classroom) => self.classroom_created(classroom).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "classroomDeletedEvent" => match serde_json::from_value(args) {
                Ok(classroom) => self.classroom_deleted(classroom).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "classroomUpdatedEvent" => match serde_json::from_value(args) {
                Ok(update) => self.classroom_updated(update).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            other => json!({ "error": format!("{other} is not executable") }),
        }
    }
}
