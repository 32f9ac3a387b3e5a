//! Inbound consistency-event payloads from the student and school services.

use serde::Deserialize;

/// Student record as this service needs to see it.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRef {
    pub id: String,
    #[serde(default)]
    pub classrooms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdated {
    pub student: StudentRef,
    #[serde(default)]
    pub new_classroom_ids: Vec<String>,
    #[serde(default)]
    pub deleted_classroom_ids: Vec<String>,
}

/// School record as this service needs to see it.
#[derive(Debug, Clone, Deserialize)]
pub struct SchoolRef {
    pub id: String,
    #[serde(default)]
    pub classrooms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolUpdated {
    pub school: SchoolRef,
    #[serde(default)]
    pub new_classroom_ids: Vec<String>,
    #[serde(default)]
    pub deleted_classroom_ids: Vec<String>,
}

/// Existence fan-out request from a peer manager.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassroomsExist {
    #[serde(default)]
    pub classrooms: Vec<String>,
}
