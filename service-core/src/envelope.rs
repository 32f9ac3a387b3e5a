//! Response envelope contract consumed by the transport dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub data: Value,
    pub errors: Vec<String>,
    pub message: String,
}

impl ApiResponse {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data,
            errors: Vec::new(),
            message: String::new(),
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            data: Value::Null,
            errors,
            message: String::new(),
        }
    }
}

/// Serialize handler output into the envelope's data slot.
pub fn to_json<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))
}

impl From<AppError> for ApiResponse {
    fn from(err: AppError) -> Self {
        let errors = match &err {
            // Authorization failures are never detailed to the client.
            AppError::Unauthorized => vec!["unauthorized".to_string()],
            AppError::Forbidden => vec!["Forbidden".to_string()],
            AppError::ValidationError(errs) => errs
                .field_errors()
                .into_iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |e| match &e.message {
                        Some(msg) => format!("{field}: {msg}"),
                        None => format!("{field}: {}", e.code),
                    })
                })
                .collect(),
            AppError::Referential { message, .. } => vec![message.clone()],
            AppError::Bus(_) => vec!["service temporarily unavailable".to_string()],
            other => vec![other.to_string()],
        };
        Self::failure(errors)
    }
}
