//! HTTP error responses.
//!
//! Every failure is reduced to a [`SafeErrorCategory`] and a client-safe
//! message. Internal details only go to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ladle::{BusError, Categorizable, SafeErrorCategory};
use serde::Serialize;
use uuid::Uuid;

use crate::common::DomainError;

#[derive(Debug)]
pub enum ApiError {
    /// A command failed.
    Bus(BusError),
    /// A read-side query failed.
    Query(anyhow::Error),
    /// The requested resource does not exist.
    NotFound { entity: &'static str, id: Uuid },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        ApiError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Category and client-safe message for this error.
    pub fn categorize(&self) -> (SafeErrorCategory, String) {
        match self {
            ApiError::Bus(err) => match err.handler_error::<DomainError>() {
                Some(domain) => (domain.category(), domain.safe_message().into_owned()),
                None => (err.category(), err.safe_message().into_owned()),
            },
            ApiError::Query(_) => (
                SafeErrorCategory::InternalError,
                "An internal error occurred".to_string(),
            ),
            ApiError::NotFound { entity, id } => {
                let err = DomainError::not_found(*entity, *id);
                (err.category(), err.safe_message().into_owned())
            }
        }
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        ApiError::Bus(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Query(err)
    }
}

pub fn status_code(category: SafeErrorCategory) -> StatusCode {
    match category {
        SafeErrorCategory::Validation => StatusCode::BAD_REQUEST,
        SafeErrorCategory::NotFound => StatusCode::NOT_FOUND,
        SafeErrorCategory::Conflict => StatusCode::CONFLICT,
        SafeErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
        SafeErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SafeErrorCategory::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (category, message) = self.categorize();
        if category == SafeErrorCategory::InternalError {
            match &self {
                ApiError::Bus(err) => tracing::error!(error = %err, "command failed"),
                ApiError::Query(err) => tracing::error!(error = ?err, "query failed"),
                ApiError::NotFound { .. } => {}
            }
        }

        (
            status_code(category),
            Json(ErrorBody {
                error: category.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_domain_errors_keep_their_category() {
        let err = ApiError::from(BusError::Handler(
            DomainError::conflict("week 1 Monday Lunch is already taken").into(),
        ));

        let (category, message) = err.categorize();
        assert_eq!(status_code(category), StatusCode::CONFLICT);
        assert_eq!(message, "week 1 Monday Lunch is already taken");
    }

    #[test]
    fn test_untyped_handler_errors_are_sanitized() {
        let err = ApiError::from(BusError::Handler(anyhow::anyhow!("pool exhausted")));

        let (category, message) = err.categorize();
        assert_eq!(category, SafeErrorCategory::InternalError);
        assert_eq!(message, "An internal error occurred");
    }

    #[test]
    fn test_lost_write_race_is_a_conflict() {
        let err = ApiError::from(BusError::Handler(
            ladle::StoreError::Conflict {
                kind: "menu",
                id: Uuid::nil(),
            }
            .into(),
        ));

        let (category, message) = err.categorize();
        assert_eq!(status_code(category), StatusCode::CONFLICT);
        assert!(!message.contains("menu"));
    }

    #[test]
    fn test_command_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(BusError::CommandTimeout {
            type_name: "CreateMenu",
            timeout: Duration::from_secs(30),
        });

        assert_eq!(status_code(err.categorize().0), StatusCode::GATEWAY_TIMEOUT);
    }
}
