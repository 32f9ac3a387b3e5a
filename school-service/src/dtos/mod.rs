//! Request bodies and their validation rule sets.

use serde::Deserialize;
use service_core::validation::{validate_id_list, NAME_RE};
use validator::Validate;

/// Body of create and update, which share one rule set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchoolPayload {
    #[validate(
        length(min = 1, max = 20),
        regex(path = *NAME_RE, message = "can only contain letters and whitespaces")
    )]
    pub name: String,
    #[validate(length(max = 100), custom(function = validate_id_list))]
    #[serde(default)]
    pub classrooms: Vec<String>,
}
