//! Classroom manager: CRUD guarded by validation and student existence
//! checks, plus the consistency handlers invoked by both peers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};

use service_core::bus::{BusModule, ExistsReply, RpcBus};
use service_core::error::AppError;
use service_core::ids::{added_and_removed, dedup_ids};

use crate::dtos::ClassroomPayload;
use crate::events::{ClassroomsExist, SchoolRef, SchoolUpdated, StudentRef, StudentUpdated};
use crate::models::Classroom;
use crate::store::ClassroomStore;

pub struct ClassroomManager {
    store: Arc<dyn ClassroomStore>,
    bus: Arc<dyn RpcBus>,
    node_type: String,
}

impl ClassroomManager {
    pub fn new(store: Arc<dyn ClassroomStore>, bus: Arc<dyn RpcBus>, node_type: &str) -> Self {
        Self {
            store,
            bus,
            node_type: node_type.to_string(),
        }
    }

    pub async fn create_classroom(&self, payload: ClassroomPayload) -> Result<Classroom, AppError> {
        let students = dedup_ids(&payload.students);

        if !students.is_empty() {
            self.ensure_students_exist(&students).await?;
        }

        let classroom = Classroom::new(payload.name, students);
        self.store.insert(&classroom).await?;
        tracing::info!(classroom_id = %classroom.id, "classroom created");

        if !classroom.students.is_empty() {
            self.emit("student.classroomCreatedEvent", json!(&classroom)).await;
        }

        Ok(classroom)
    }

    pub async fn get_classrooms(&self) -> Result<Vec<Classroom>, AppError> {
        self.store.find_all().await
    }

    pub async fn get_classroom_by_id(&self, id: &str) -> Result<Classroom, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Classroom {id} not found")))
    }

    pub async fn update_classroom(
        &self,
        id: &str,
        payload: ClassroomPayload,
    ) -> Result<Classroom, AppError> {
        let students = dedup_ids(&payload.students);

        if !students.is_empty() {
            self.ensure_students_exist(&students).await?;
        }

        let Some(mut classroom) = self.store.find_by_id(id).await? else {
            return Err(AppError::not_found("Classroom not found"));
        };
        let old_students = classroom.students.clone();

        // Only name and students are caller-writable; the school link moves
        // exclusively through school consistency events.
        classroom.name = payload.name;
        classroom.students = students.clone();
        classroom.updated_at = chrono::Utc::now();
        self.store.replace(&classroom).await?;

        let (new_student_ids, deleted_student_ids) = added_and_removed(&old_students, &students);
        if !new_student_ids.is_empty() || !deleted_student_ids.is_empty() {
            self.emit(
                "student.classroomUpdatedEvent",
                json!({
                    "classroom": &classroom,
                    "newStudentIds": &new_student_ids,
                    "deletedStudentIds": &deleted_student_ids,
                }),
            )
            .await;
        }

        Ok(classroom)
    }

    pub async fn delete_classroom(&self, id: &str) -> Result<(), AppError> {
        let Some(classroom) = self.store.delete_by_id(id).await? else {
            return Err(AppError::not_found("Classroom not found"));
        };
        tracing::info!(classroom_id = %classroom.id, "classroom deleted");

        if !classroom.students.is_empty() {
            self.emit("student.classroomDeletedEvent", json!(&classroom)).await;
        }
        if classroom.school.is_some() {
            self.emit("school.classroomDeletedEvent", json!(&classroom)).await;
        }

        Ok(())
    }

    /// Pre-commit referential check against the student collection.
    async fn ensure_students_exist(&self, student_ids: &[String]) -> Result<(), AppError> {
        let reply = self
            .bus
            .call(
                &self.node_type,
                "student.studentsExistEvent",
                json!({ "students": student_ids }),
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
                    .unwrap_or_else(|| "referenced students do not exist".to_string()),
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

    async fn classrooms_exist(&self, req: ClassroomsExist) -> Value {
        let checks = req.classrooms.iter().map(|id| self.store.count_by_id(id));
        let counts = join_all(checks).await;

        let mut missing = Vec::new();
        for (id, count) in req.classrooms.iter().zip(counts) {
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
            ExistsReply::some_missing("Classrooms", missing)
        };
        json!(reply)
    }

    async fn student_created(&self, student: StudentRef) -> Value {
        if let Err(err) = self
            .store
            .add_student(&student.classrooms, &student.id)
            .await
        {
            tracing::error!(error = %err, "failed to apply studentCreatedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }

    async fn student_removed(&self, student: StudentRef) -> Value {
        if let Err(err) = self.store.remove_student_everywhere(&student.id).await {
            tracing::error!(error = %err, "failed to apply studentRemovedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }

    async fn student_updated(&self, update: StudentUpdated) -> Value {
        if !update.new_classroom_ids.is_empty() {
            if let Err(err) = self
                .store
                .add_student(&update.new_classroom_ids, &update.student.id)
                .await
            {
                tracing::error!(error = %err, "failed to apply studentUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        if !update.deleted_classroom_ids.is_empty() {
            if let Err(err) = self
                .store
                .remove_student(&update.deleted_classroom_ids, &update.student.id)
                .await
            {
                tracing::error!(error = %err, "failed to apply studentUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        json!({ "ok": true })
    }

    async fn school_created(&self, school: SchoolRef) -> Value {
        if let Err(err) = self.store.set_school(&school.classrooms, &school.id).await {
            tracing::error!(error = %err, "failed to apply schoolCreatedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }

    async fn school_updated(&self, update: SchoolUpdated) -> Value {
        if !update.new_classroom_ids.is_empty() {
            if let Err(err) = self
                .store
                .set_school(&update.new_classroom_ids, &update.school.id)
                .await
            {
                tracing::error!(error = %err, "failed to apply schoolUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        if !update.deleted_classroom_ids.is_empty() {
            if let Err(err) = self.store.clear_school(&update.deleted_classroom_ids).await {
                tracing::error!(error = %err, "failed to apply schoolUpdatedEvent");
                return json!({ "error": "failed to apply event" });
            }
        }
        json!({ "ok": true })
    }

    async fn school_deleted(&self, school: SchoolRef) -> Value {
        if let Err(err) = self.store.clear_school(&school.classrooms).await {
            tracing::error!(error = %err, "failed to apply schoolDeletedEvent");
            return json!({ "error": "failed to apply event" });
        }
        json!({ "ok": true })
    }
}

#[async_trait]
impl BusModule for ClassroomManager {
    fn module_name(&self) -> &'static str {
        "classroom"
    }

    fn exposed(&self) -> &'static [&'static str] {
        &[
            "studentRemovedEvent",
            "studentCreatedEvent",
            "studentUpdatedEvent",
            "classroomsExistEvent",
            "schoolCreatedEvent",
            "schoolUpdatedEvent",
            "schoolDeletedEvent",
        ]
    }

    async fn handle(&self, function: &str, args: Value) -> Value {
        match function {
            "classroomsExistEvent" => match serde_json::from_value(args) {
                Ok(req) => self.classrooms_exist(req).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "studentCreatedEvent" => match serde_json::from_value(args) {
                Ok(student) => self.student_created(student).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "studentRemovedEvent" => match serde_json::from_value(args) {
                Ok(student) => self.student_removed(student).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "studentUpdatedEvent" => match serde_json::from_value(args) {
                Ok(update) => self.student_updated(update).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "schoolCreatedEvent" => match serde_json::from_value(args) {
                Ok(school) => self.school_created(school).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "schoolUpdatedEvent" => match serde_json::from_value(args) {
                Ok(update) => self.school_updated(update).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            "schoolDeletedEvent" => match serde_json::from_value(args) {
                Ok(school) => self.school_deleted(school).await,
                Err(err) => json!({ "error": format!("bad payload: {err}") }),
            },
            other => json!({ "error": format!("{other} is not executable") }),
        }
    }
}
