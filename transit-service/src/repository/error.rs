//! Repository error types
//!
//! Every repository operation fails with a [`RepositoryError`]: a typed kind,
//! the operation that failed, and an optional map from field name to message
//! key for form-level display.
//!
//! # Example
//!
//! ```rust
//! use transit_service::repository::{RepositoryError, RepositoryErrorKind, INVALID_ID};
//!
//! let error = RepositoryError::not_found("Route", "8c1b0a6e-0000-4000-8000-000000000000");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.fields.get("id").map(String::as_str), Some(INVALID_ID));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use super::parameters::ValidationError;

/// Message key for a unique field that collides with an existing row
pub const ALREADY_TAKEN: &str = "already taken";
/// Message key for an identifier that matches no row
pub const INVALID_ID: &str = "invalid id";

/// Field name to message key
pub type FieldErrors = BTreeMap<String, String>;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Inserting a new entity
    Save,
    /// Patching an existing entity
    Update,
    /// Removing an entity
    Delete,
    /// Loading a single entity by id
    GetOne,
    /// Loading a filtered page of entities
    GetMany,
    /// Adding many-to-many edges
    Attach,
    /// Removing many-to-many edges
    Detach,
    /// Building query parameters from request input
    BuildParameters,
}

impl RepositoryOperation {
    /// Whether the operation writes to storage
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Save | Self::Update | Self::Delete | Self::Attach | Self::Detach
        )
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::GetOne => write!(f, "get_one"),
            Self::GetMany => write!(f, "get_many"),
            Self::Attach => write!(f, "attach"),
            Self::Detach => write!(f, "detach"),
            Self::BuildParameters => write!(f, "build_parameters"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No row matched the targeted id
    NotFound,
    /// The write conflicts with existing data (carries field descriptions)
    Unprocessable,
    /// Request input was rejected before reaching storage
    Validation,
    /// Opaque storage failure
    Internal,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Unprocessable => write!(f, "unprocessable"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal_error"),
        }
    }
}

/// Structured repository error with operation context
///
/// `message` is diagnostic text for logs. For [`RepositoryErrorKind::Internal`]
/// it may contain driver output and must not be shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Route", "Order")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<String>,
    /// Field name to message key
    pub fields: FieldErrors,
}

impl RepositoryError {
    /// Create a new repository error without field attribution
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
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
        Self::new(
            RepositoryOperation::GetOne,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
        .with_field("id", INVALID_ID)
    }

    /// Create an "unprocessable" error for a unique field collision
    ///
    /// ```rust
    /// use transit_service::repository::{RepositoryError, RepositoryOperation, ALREADY_TAKEN};
    ///
    /// let error = RepositoryError::already_taken(RepositoryOperation::Save, "plate_number");
    /// assert_eq!(error.fields["plate_number"], ALREADY_TAKEN);
    /// ```
    pub fn already_taken(operation: RepositoryOperation, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            operation,
            RepositoryErrorKind::Unprocessable,
            format!("Value of '{}' is already taken", field),
        )
        .with_field(field, ALREADY_TAKEN)
    }

    /// Create an internal error
    pub fn internal(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Internal, message)
    }

    /// Create a validation error from a rejected request input
    pub fn validation(operation: RepositoryOperation, err: &ValidationError) -> Self {
        Self::new(operation, RepositoryErrorKind::Validation, err.to_string())
            .with_field(err.field(), err.message_key())
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

    /// Add the entity type only
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
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
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether this error carries field descriptions
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

impl From<ValidationError> for RepositoryError {
    fn from(err: ValidationError) -> Self {
        Self::validation(RepositoryOperation::BuildParameters, &err)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}
