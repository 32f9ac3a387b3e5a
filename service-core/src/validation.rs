//! DTO parsing plus the seam to the declarative field-validation engine.
//!
//! Rule sets live on the DTOs as `validator` derives; the shared pieces
//! (regexes, id-list and password rules) live here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Entity and display names: letters and whitespace only.
pub static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-zA-Z ]+$").unwrap());

/// Account usernames: lowercase letters and underscores.
pub static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z_]+$").unwrap());

const PASSWORD_SPECIALS: &str = "@$!%*#?&";

/// Deserialize a request body and run its rule set, mapping both failure
/// kinds into the envelope taxonomy.
pub fn parse_valid<T>(body: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let dto: T = serde_json::from_value(body)
        .map_err(|e| AppError::bad_request(format!("Json parse error: {e}")))?;
    dto.validate()?;
    Ok(dto)
}

/// Extract and check the `id` route param of by-id operations.
pub fn require_id(param: Option<&str>) -> Result<String, AppError> {
    let id = param.ok_or_else(|| AppError::bad_request("id param is required"))?;
    Uuid::parse_str(id).map_err(|_| AppError::bad_request(format!("{id} is not a valid id")))?;
    Ok(id.to_string())
}

/// Every referenced id must be a well-formed uuid.
pub fn validate_id_list(ids: &[String]) -> Result<(), ValidationError> {
    for id in ids {
        if Uuid::parse_str(id).is_err() {
            let mut err = ValidationError::new("id");
            err.message = Some(format!("{id} is not a valid id").into());
            return Err(err);
        }
    }
    Ok(())
}

/// At least one uppercase letter, one lowercase letter, one digit and one
/// special character out of `@$!%*#?&`.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if has_upper && has_lower && has_digit && has_special {
        Ok(())
    } else {
        let mut err = ValidationError::new("password");
        err.message = Some(
            "must contain an uppercase letter, a lowercase letter, a digit and a special character"
                .into(),
        );
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_regex_accepts_letters_and_spaces() {
        assert!(NAME_RE.is_match("Fifth Grade"));
        assert!(!NAME_RE.is_match("5A"));
        assert!(!NAME_RE.is_match(""));
    }

    #[test]
    fn username_regex_is_lowercase_only() {
        assert!(USERNAME_RE.is_match("head_admin"));
        assert!(!USERNAME_RE.is_match("Head"));
        assert!(!USERNAME_RE.is_match("admin1"));
    }

    #[test]
    fn id_list_rejects_non_uuid_entries() {
        let ok = vec![Uuid::new_v4().to_string()];
        assert!(validate_id_list(&ok).is_ok());
        assert!(validate_id_list(&["not-an-id".to_string()]).is_err());
    }

    #[test]
    fn password_rule_requires_all_character_classes() {
        assert!(validate_password("p@ssW0rD").is_ok());
        assert!(validate_password("password").is_err());
        assert!(validate_password("PASSW0RD!").is_err());
        assert!(validate_password("p@ssWord").is_err());
    }
}
