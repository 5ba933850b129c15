//! API error types for handler operations
//!
//! This module provides structured error types for REST handler operations,
//! with automatic HTTP status code mapping via `IntoResponse`.
//!
//! | Repository kind | Status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `Unprocessable` | 422 |
//! | `Validation` | 400 |
//! | `Internal` | 500 |
//!
//! # Example
//!
//! ```rust
//! use transit_service::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("Order", "3f0c");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.fields.get("id").map(String::as_str), Some("invalid id"));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::repository::{
    FieldErrors, RepositoryError, RepositoryErrorKind, RepositoryOperation, INVALID_ID,
};

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing entities
    List,
    /// Getting a single entity by ID
    Get,
    /// Creating a new entity
    Create,
    /// Updating an existing entity
    Update,
    /// Deleting an entity
    Delete,
    /// Linking related entities
    Attach,
    /// Unlinking related entities
    Detach,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Attach => write!(f, "attach"),
            Self::Detach => write!(f, "detach"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity was not found
    NotFound,
    /// Write conflicts with existing data
    Unprocessable,
    /// Request input was rejected
    BadRequest,
    /// Internal server error
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Unprocessable => write!(f, "unprocessable"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }
}

/// Structured API error with operation context and field descriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Client-facing error message
    pub message: String,
    /// The type of entity involved (e.g., "Route", "Order")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
    /// Field name to message key
    pub fields: FieldErrors,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            fields: FieldErrors::new(),
        }
    }

    /// Create a "not found" error attributed to `id`
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
            .with_field("id", INVALID_ID)
    }

    /// Create a "bad request" error
    ///
    /// ```rust
    /// use transit_service::handlers::ApiError;
    ///
    /// let error = ApiError::bad_request("Malformed id").with_field("id", "invalid id");
    /// assert_eq!(error.kind.status_code().as_u16(), 400);
    /// ```
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::BadRequest, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, ApiErrorKind::InternalError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Attribute the error to a field
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields.insert(field.into(), message.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
struct ApiErrorResponse {
    error: String,
    code: String,
    status: u16,
    #[serde(skip_serializing_if = "FieldErrors::is_empty", default)]
    fields: FieldErrors,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let code = self.kind.error_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        } else {
            tracing::info!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                fields = ?self.fields,
                "API error: {}", self.message
            );
        }

        let response = ApiErrorResponse {
            error: self.message,
            code,
            status: status.as_u16(),
            fields: self.fields,
        };

        (status, Json(response)).into_response()
    }
}

/// Convert RepositoryOperation to ApiOperation
fn repository_operation_to_api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::Save => ApiOperation::Create,
        RepositoryOperation::Update => ApiOperation::Update,
        RepositoryOperation::Delete => ApiOperation::Delete,
        RepositoryOperation::GetOne => ApiOperation::Get,
        RepositoryOperation::GetMany | RepositoryOperation::BuildParameters => ApiOperation::List,
        RepositoryOperation::Attach => ApiOperation::Attach,
        RepositoryOperation::Detach => ApiOperation::Detach,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = repository_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            RepositoryErrorKind::NotFound => ApiErrorKind::NotFound,
            RepositoryErrorKind::Unprocessable => ApiErrorKind::Unprocessable,
            RepositoryErrorKind::Validation => ApiErrorKind::BadRequest,
            RepositoryErrorKind::Internal => ApiErrorKind::InternalError,
        };

        // Internal failures keep their driver text in the logs only
        if kind == ApiErrorKind::InternalError {
            tracing::error!(error = %err, "Repository failure");
            return Self {
                operation,
                kind,
                message: "An internal error occurred".to_string(),
                entity_type: err.entity_type,
                entity_id: err.entity_id,
                fields: FieldErrors::new(),
            };
        }

        Self {
            operation,
            kind,
            message: err.message,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
            fields: err.fields,
        }
    }
}

impl From<crate::repository::ValidationError> for ApiError {
    fn from(err: crate::repository::ValidationError) -> Self {
        RepositoryError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ValidationError, ALREADY_TAKEN};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorKind::Unprocessable.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiErrorKind::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_kind_error_codes() {
        assert_eq!(ApiErrorKind::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ApiErrorKind::Unprocessable.error_code(), "UNPROCESSABLE");
        assert_eq!(ApiErrorKind::InternalError.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_from_repository_error_keeps_fields() {
        let err = RepositoryError::already_taken(RepositoryOperation::Save, "reference");
        let api: ApiError = err.into();
        assert_eq!(api.kind, ApiErrorKind::Unprocessable);
        assert_eq!(api.operation, ApiOperation::Create);
        assert_eq!(api.fields["reference"], ALREADY_TAKEN);
    }

    #[test]
    fn test_from_repository_error_hides_internal_details() {
        let err = RepositoryError::internal(RepositoryOperation::GetMany, "no such table: orders")
            .with_field("x", "y");
        let api: ApiError = err.into();
        assert_eq!(api.kind, ApiErrorKind::InternalError);
        assert_eq!(api.message, "An internal error occurred");
        assert!(api.fields.is_empty());
    }

    #[test]
    fn test_from_validation_error() {
        let api: ApiError = ValidationError::PerPageExceeded {
            requested: 500,
            max: 100,
        }
        .into();
        assert_eq!(api.kind, ApiErrorKind::BadRequest);
        assert_eq!(api.operation, ApiOperation::List);
        assert_eq!(api.fields["per_page"], "per page limit exceeded");
    }

    #[test]
    fn test_display_with_entity() {
        let error = ApiError::not_found("Route", "r-1");
        assert_eq!(
            error.to_string(),
            "API not_found error during get: Entity not found [Route: r-1]"
        );
    }

    #[tokio::test]
    async fn test_not_found_response_body() {
        let response = ApiError::not_found("Order", "abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Entity not found",
                "code": "NOT_FOUND",
                "status": 404,
                "fields": {"id": "invalid id"}
            })
        );
    }

    #[tokio::test]
    async fn test_internal_response_omits_fields() {
        let response = ApiError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body.get("fields").is_none());
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
