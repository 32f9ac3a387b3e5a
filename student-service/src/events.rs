//! Inbound consistency-event payloads from the classroom service.

use serde::Deserialize;

/// Classroom record as this service needs to see it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassroomRef {
    pub id: String,
    #[serde(default)]
    pub students: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomUpdated {
    pub classroom: ClassroomRef,
    #[serde(default)]
    pub new_student_ids: Vec<String>,
    #[serde(default)]
    pub deleted_student_ids: Vec<String>,
}

/// Existence fan-out request from a peer manager.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentsExist {
    #[serde(default)]
    pub students: Vec<String>,
}
