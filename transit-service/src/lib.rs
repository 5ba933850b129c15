//! # transit-service
//!
//! Parameterized repository layer for a multi-entity transit booking backend.
//! One generic repository serves every entity; entities only declare their
//! table, filterable fields, unique fields and associations.
//!
//! ## Features
//!
//! - **Validated list queries**: [`Parameters`](repository::Parameters) turns raw
//!   filter/page/sort strings into a bounded, whitelisted query descriptor
//! - **Uniform CRUD**: [`Repository`](repository::Repository) (save, update,
//!   delete, get one, get many) with [`Meta`](repository::Meta) pagination
//! - **Associations**: [`AssociationMutator`](repository::AssociationMutator)
//!   attach/detach for many-to-many links
//! - **Error classification**: storage failures become `NotFound`,
//!   `Unprocessable` (with field descriptions) or an opaque `Internal`
//! - **Response layer** (`handlers` feature): JSON envelopes and HTTP error mapping
//!
//! ## Example
//!
//! ```rust,no_run
//! use transit_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let pool = transit_service::database::connect(&config.database).await?;
//!     let repos = Repositories::new(pool);
//!
//!     let route = repos
//!         .routes()
//!         .save(Route::new("JKT-BDG", "Jakarta", "Bandung", 150.0))
//!         .await?;
//!
//!     let params = Parameters::build(
//!         [("origin", "Jakarta")],
//!         "1",
//!         "",
//!         "-created_at",
//!         Route::filter_spec(),
//!         config.page_limits(),
//!     )?;
//!     let (routes, meta) = repos.routes().get_many(&params).await?;
//!     assert_eq!(meta.total, routes.len() as u64);
//!     assert_eq!(routes[0].id, route.id);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod entities;
pub mod error;
pub mod observability;
pub mod repository;

#[cfg(feature = "handlers")]
pub mod handlers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, PaginationConfig};

    pub use crate::error::{Error, Result};

    pub use crate::observability::init_tracing;

    pub use crate::entities::{
        Driver, DriverPatch, Order, OrderPatch, Payment, PaymentPatch, Price, PricePatch,
        Repositories, Route, RoutePatch, Vehicle, VehiclePatch,
    };

    pub use crate::repository::{
        AssociationMutator, Entity, FilterSpec, Meta, OrderDirection, PageLimits, Parameters,
        Repository, RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
        SqlRepository, ValidationError,
    };

    // Handler traits for REST CRUD patterns
    #[cfg(feature = "handlers")]
    pub use crate::handlers::{
        ApiError, ApiErrorKind, ApiOperation, AssociationHandler, CollectionHandler,
        ItemResponse, ListQuery, ListResponse, ResourceHandler,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros and types
    pub use tracing::{debug, error, info, instrument, trace, warn, Level, Span};

    // Re-export tokio for async runtime
    pub use tokio;

    pub use thiserror::Error;

    // Re-export time utilities
    pub use chrono::{DateTime, Utc};

    // Re-export UUID
    pub use uuid::Uuid;
}
