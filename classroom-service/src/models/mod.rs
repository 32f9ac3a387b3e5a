use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::ids::new_id;

/// Classroom entity. `students` is the owned side of classroom↔student;
/// `school` is the inverse side of the exclusive school↔classroom relation,
/// written only by school consistency events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Classroom {
    pub fn new(name: String, students: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            students,
            school: None,
            created_at: now,
            updated_at: now,
        }
    }
}
