//! Business rule violations raised by aggregates and command handlers.

use std::borrow::Cow;

use ladle::{Categorizable, SafeErrorCategory};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Conflict(message.into())
    }
}

impl Categorizable for DomainError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            DomainError::NotFound { .. } => SafeErrorCategory::NotFound,
            DomainError::Validation(_) => SafeErrorCategory::Validation,
            DomainError::Conflict(_) => SafeErrorCategory::Conflict,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        // Every variant is built from caller-visible input.
        self.to_string().into()
    }
}

/// Reject blank names and trim the rest.
pub fn require_name(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
