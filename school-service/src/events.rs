//! Inbound consistency-event payloads from the classroom service.

use serde::Deserialize;

/// Classroom record as this service needs to see it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassroomRef {
    pub id: String,
}
