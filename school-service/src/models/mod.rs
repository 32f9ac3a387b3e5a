use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::ids::new_id;

/// School entity. `classrooms` is the owned side of the exclusive
/// school↔classroom relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub classrooms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl School {
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
