//! Crate-level error type
//!
//! Repository operations return the structured
//! [`RepositoryError`](crate::repository::RepositoryError). This type covers
//! everything around them: loading configuration, opening the pool and
//! running migrations.

use thiserror::Error;

use crate::repository::{RepositoryError, ValidationError};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Database driver error outside a repository operation
    #[error("Database error: {0}")]
    Database(Box<sqlx::Error>),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(Box<sqlx::migrate::MigrateError>),

    /// Repository operation failed
    #[error("{0}")]
    Repository(RepositoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal server error: {0}")]
    Internal(String),
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(Box::new(err))
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Error::Migration(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Repository(err.into())
    }
}
