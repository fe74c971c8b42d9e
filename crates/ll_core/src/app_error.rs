use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub schema_version: u32,
    pub code: String,
    pub category: String,
    pub message: String,
    pub retryable: bool,
    pub details: Value,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(code: &str, category: &str, message: &str, retryable: bool, details: Value) -> Self {
        Self {
            schema_version: 1,
            code: code.to_string(),
            category: category.to_string(),
            message: message.to_string(),
            retryable,
            details,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self::new("LL_INTERNAL_ERROR", "internal", message, false, json!({}))
    }

    pub fn unauthorized() -> Self {
        Self::new(
            "LL_AUTH_REQUIRED",
            "auth",
            "a signed-in identity is required",
            false,
            json!({}),
        )
    }

    pub fn invalid_payload(message: &str, details: Value) -> Self {
        Self::new("LL_SYNC_PAYLOAD_INVALID", "validation", message, false, details)
    }

    pub fn is_auth(&self) -> bool {
        self.category == "auth"
    }

    pub fn is_validation(&self) -> bool {
        self.category == "validation"
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
