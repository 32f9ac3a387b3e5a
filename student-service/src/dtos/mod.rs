//! Request bodies and their validation rule sets.

use serde::Deserialize;
use service_core::validation::{validate_id_list, NAME_RE};
use validator::Validate;

/// Body of create and update, which share one rule set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudentPayload {
    #[validate(
        length(min = 1, max = 20),
        regex(path = *NAME_RE, message = "can only contain letters and whitespaces")
    )]
    pub name: String,
    #[validate(length(max = 100), custom(function = validate_id_list))]
    #[serde(default)]
    pub classrooms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_must_be_letters_and_spaces() {
        let payload = StudentPayload {
            name: "5A".to_string(),
            classrooms: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn classroom_ids_must_be_well_formed() {
        let payload = StudentPayload {
            name: "Hamada".to_string(),
            classrooms: vec!["not-an-id".to_string()],
        };
        assert!(payload.validate().is_err());
    }
}
