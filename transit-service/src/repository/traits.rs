//! Repository trait definitions
//!
//! This module provides the uniform operation set every entity repository
//! exposes, using RPITIT (Return Position Impl Trait In Traits), available
//! since Rust 1.75.
//!
//! # Overview
//!
//! - [`Repository`]: save, update, delete, get-one and paginated get-many
//! - [`AssociationMutator`]: attach/detach for many-to-many associations
//!
//! # Example
//!
//! ```rust,ignore
//! use transit_service::entities::{Repositories, Vehicle};
//! use transit_service::repository::{PageLimits, Parameters, Repository};
//!
//! let vehicles = repositories.vehicles();
//! let saved = vehicles.save(Vehicle::new("B 1234 XY", "Hiace", 14)).await?;
//!
//! let params = Parameters::build(
//!     [("capacity__gte", "10")],
//!     "1",
//!     "20",
//!     "-created_at",
//!     Vehicle::filter_spec(),
//!     PageLimits::default(),
//! )?;
//! let (items, meta) = vehicles.get_many(&params).await?;
//! ```

use std::future::Future;

use uuid::Uuid;

use super::entity::Entity;
use super::error::RepositoryError;
use super::meta::Meta;
use super::parameters::Parameters;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Uniform CRUD contract for one entity type
///
/// Failures are classified the same way for every entity: a missing id is
/// `NotFound` attributed to `id`, a unique collision on a write is
/// `Unprocessable` attributed to the colliding field, and anything else is
/// `Internal`.
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert a new entity
    ///
    /// A fresh id and `created_at` are assigned; any id on `entity` is ignored.
    fn save(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Apply a partial update
    ///
    /// Only fields present in `patch` are modified. An empty patch returns the
    /// current entity unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` with `{"id": "invalid id"}` if no entity has `id`.
    fn update(
        &self,
        id: Uuid,
        patch: E::Patch,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Delete an entity by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entity has `id`, so a second delete of the same
    /// id fails.
    fn delete(&self, id: Uuid) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Load an entity by id, resolving its preloaded associations
    fn get_one(&self, id: Uuid) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Load one page of entities matching `params`
    ///
    /// The count and the page are read from the same snapshot. An empty page
    /// is a success.
    fn get_many(
        &self,
        params: &Parameters,
    ) -> impl Future<Output = RepositoryResult<(Vec<E>, Meta)>> + Send;
}

/// Many-to-many link management layered on [`Repository`]
///
/// Related ids are not checked for existence here.
pub trait AssociationMutator<E: Entity>: Repository<E> {
    /// Add edges from `id` to each of `related`, keeping existing ones
    ///
    /// Re-attaching an existing edge is a silent success. Returns the owner
    /// with the refreshed association.
    fn attach(
        &self,
        id: Uuid,
        association: &str,
        related: &[Uuid],
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Remove edges from `id` to each of `related`
    ///
    /// Edges that do not exist are ignored. Returns the owner with the
    /// refreshed association.
    fn detach(
        &self,
        id: Uuid,
        association: &str,
        related: &[Uuid],
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Current related ids of an association, sorted
    fn related_ids(
        &self,
        id: Uuid,
        association: &str,
    ) -> impl Future<Output = RepositoryResult<Vec<Uuid>>> + Send;
}
