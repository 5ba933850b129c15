//! Storage failure classification
//!
//! Every repository operation funnels driver errors through [`classify`], so the
//! mapping from storage failure to [`RepositoryError`] is the same for every
//! entity:
//!
//! | Failure | Targeted lookup / mutation | `GetMany` |
//! |---|---|---|
//! | no rows | `NotFound` on `id` | `Internal` |
//! | unique violation | `Unprocessable` on the conflicting field | `Internal` |
//! | anything else | `Internal` | `Internal` |
//!
//! Reads never surface `Unprocessable`.

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, INVALID_ID};

/// Driver-independent view of a storage failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageFailure {
    /// A targeted lookup matched no row
    NoRows,
    /// A unique index rejected the write
    UniqueViolation {
        /// Constraint name when the driver reports one
        constraint: Option<String>,
    },
    /// Any other failure, with the driver's message
    Other(String),
}

impl StorageFailure {
    /// Whether this is a uniqueness violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

impl From<&sqlx::Error> for StorageFailure {
    fn from(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NoRows,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_string),
                }
            }
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StorageFailure {
    fn from(err: sqlx::Error) -> Self {
        Self::from(&err)
    }
}

/// Map a storage failure to a repository error
///
/// `conflicting_field` is the unique field a violation was traced to, if any.
pub fn classify(
    operation: RepositoryOperation,
    failure: &StorageFailure,
    conflicting_field: Option<&str>,
) -> RepositoryError {
    match failure {
        StorageFailure::NoRows if operation != RepositoryOperation::GetMany => {
            RepositoryError::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
                .with_field("id", INVALID_ID)
        }
        StorageFailure::UniqueViolation { constraint } if operation.is_mutation() => {
            match conflicting_field {
                Some(field) => RepositoryError::already_taken(operation, field),
                None => RepositoryError::new(
                    operation,
                    RepositoryErrorKind::Unprocessable,
                    format!(
                        "Unique constraint violated ({})",
                        constraint.as_deref().unwrap_or("unnamed")
                    ),
                ),
            }
        }
        StorageFailure::NoRows => {
            RepositoryError::internal(operation, "Unexpected empty result")
        }
        StorageFailure::UniqueViolation { constraint } => RepositoryError::internal(
            operation,
            format!(
                "Unique constraint violated during read ({})",
                constraint.as_deref().unwrap_or("unnamed")
            ),
        ),
        StorageFailure::Other(message) => RepositoryError::internal(operation, message.clone()),
    }
}

/// Find the unique field a constraint name refers to
///
/// Matches `plate_number`, `vehicles_plate_number_key` and
/// `vehicles.plate_number` style names; the longest matching field wins.
pub fn constraint_field(constraint: &str, unique_fields: &[&'static str]) -> Option<&'static str> {
    unique_fields
        .iter()
        .copied()
        .filter(|field| {
            constraint == *field
                || constraint.ends_with(&format!(".{}", field))
                || constraint.contains(&format!("_{}_", field))
                || constraint.ends_with(&format!("_{}", field))
        })
        .max_by_key(|field| field.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ALREADY_TAKEN;

    #[test]
    fn test_no_rows_on_targeted_lookup_is_not_found() {
        for op in [
            RepositoryOperation::GetOne,
            RepositoryOperation::Update,
            RepositoryOperation::Delete,
            RepositoryOperation::Attach,
        ] {
            let err = classify(op, &StorageFailure::NoRows, None);
            assert_eq!(err.kind, RepositoryErrorKind::NotFound);
            assert_eq!(err.fields["id"], INVALID_ID);
            assert_eq!(err.operation, op);
        }
    }

    #[test]
    fn test_unique_violation_on_save_is_unprocessable() {
        let failure = StorageFailure::UniqueViolation { constraint: None };
        let err = classify(RepositoryOperation::Save, &failure, Some("plate_number"));
        assert_eq!(err.kind, RepositoryErrorKind::Unprocessable);
        assert_eq!(err.fields["plate_number"], ALREADY_TAKEN);
    }

    #[test]
    fn test_unattributed_unique_violation_has_no_fields() {
        let failure = StorageFailure::UniqueViolation {
            constraint: Some("idx_x".into()),
        };
        let err = classify(RepositoryOperation::Update, &failure, None);
        assert_eq!(err.kind, RepositoryErrorKind::Unprocessable);
        assert!(!err.has_fields());
    }

    #[test]
    fn test_reads_never_surface_unprocessable() {
        let failure = StorageFailure::UniqueViolation { constraint: None };
        for op in [RepositoryOperation::GetOne, RepositoryOperation::GetMany] {
            let err = classify(op, &failure, Some("code"));
            assert_eq!(err.kind, RepositoryErrorKind::Internal);
            assert!(!err.has_fields());
        }
    }

    #[test]
    fn test_no_rows_on_get_many_is_internal() {
        let err = classify(RepositoryOperation::GetMany, &StorageFailure::NoRows, None);
        assert_eq!(err.kind, RepositoryErrorKind::Internal);
    }

    #[test]
    fn test_other_failure_is_internal_without_fields() {
        let failure = StorageFailure::Other("database is locked".into());
        let err = classify(RepositoryOperation::Save, &failure, None);
        assert_eq!(err.kind, RepositoryErrorKind::Internal);
        assert_eq!(err.message, "database is locked");
        assert!(!err.has_fields());
    }

    #[test]
    fn test_from_sqlx_error() {
        assert_eq!(
            StorageFailure::from(&sqlx::Error::RowNotFound),
            StorageFailure::NoRows
        );
        assert!(matches!(
            StorageFailure::from(sqlx::Error::PoolTimedOut),
            StorageFailure::Other(_)
        ));
    }

    #[test]
    fn test_constraint_field() {
        let fields = ["license_number", "phone"];
        assert_eq!(constraint_field("phone", &fields), Some("phone"));
        assert_eq!(
            constraint_field("drivers_license_number_key", &fields),
            Some("license_number")
        );
        assert_eq!(constraint_field("drivers.phone", &fields), Some("phone"));
        assert_eq!(constraint_field("drivers_pkey", &fields), None);
    }
}
