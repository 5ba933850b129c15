//! Parameterized repository layer
//!
//! Every entity shares one query, pagination and association implementation:
//!
//! - **Filtering**: [`FilterSpec`] whitelists the fields an entity accepts in
//!   filter and sort input; [`Parameters`] validates raw request strings
//!   against it and carries bound values only
//! - **Pagination**: [`Meta`] computes page totals from [`Parameters`] and a
//!   row count
//! - **CRUD**: [`Repository`] is the uniform save/update/delete/get-one/get-many
//!   contract, implemented once by [`SqlRepository`] for any [`Entity`]
//! - **Associations**: [`AssociationMutator`] attaches and detaches
//!   many-to-many edges
//! - **Errors**: [`classify`] turns storage failures into field-attributed
//!   [`RepositoryError`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use transit_service::entities::{Order, Repositories};
//! use transit_service::repository::{AssociationMutator, PageLimits, Parameters, Repository};
//!
//! let orders = repositories.orders();
//!
//! let params = Parameters::build(
//!     [("status", "pending")],
//!     "1",
//!     "20",
//!     "",
//!     Order::filter_spec(),
//!     PageLimits::default(),
//! )?;
//! let (pending, meta) = orders.get_many(&params).await?;
//!
//! let order = orders.attach(pending[0].id, "payments", &[payment.id]).await?;
//! ```

mod classify;
mod entity;
mod error;
mod filter;
mod meta;
mod parameters;
mod sql;
mod traits;

// Re-export all public types
pub use classify::{classify, constraint_field, StorageFailure};
pub use entity::{double_option, set_if_present, set_nullable, Association, Entity, Patch};
pub use error::{
    FieldErrors, RepositoryError, RepositoryErrorKind, RepositoryOperation, ALREADY_TAKEN,
    INVALID_ID,
};
pub use filter::{
    FieldKind, FilterCondition, FilterField, FilterOperator, FilterSpec, OrderDirection,
    PredicateSink, TemplateSink, Value,
};
pub use meta::Meta;
pub use parameters::{
    PageLimits, Parameters, ValidationError, DEFAULT_PER_PAGE, MAX_PER_PAGE, OPERATOR_SEPARATOR,
};
pub use sql::SqlRepository;
pub use traits::{AssociationMutator, Repository, RepositoryResult};
