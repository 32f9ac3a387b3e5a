use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::ids::new_id;

/// Student entity. `classrooms` is the owned side of the student↔classroom
/// relationship; the inverse side lives in the classroom collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub classrooms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: String, classrooms: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            classrooms,
            created_at: now,
            updated_at: now,
        }
    }
}
