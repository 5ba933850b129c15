//! Handler trait definitions for REST CRUD patterns
//!
//! This module provides generic traits for REST collection handlers using RPITIT
//! (Return Position Impl Trait In Traits), available since Rust 1.75.
//!
//! # Overview
//!
//! - [`CollectionHandler`]: Standard CRUD operations (list, get, create, update, delete)
//! - [`AssociationHandler`]: attach/detach for many-to-many relations
//! - [`ResourceHandler`]: implements both for any [`Entity`] on top of a repository
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{extract::{Path, Query, State}, routing::get, Router};
//! use transit_service::entities::{Order, Repositories};
//! use transit_service::handlers::{ApiError, CollectionHandler, ListQuery, ResourceHandler};
//!
//! async fn list_orders(
//!     State(handler): State<ResourceHandler<Order>>,
//!     Query(query): Query<ListQuery>,
//! ) -> Result<impl IntoResponse, ApiError> {
//!     handler.list(query).await
//! }
//!
//! let orders = ResourceHandler::new(repos.orders(), config.page_limits());
//! let app = Router::new().route("/orders", get(list_orders)).with_state(orders);
//! ```

use std::future::Future;
use std::marker::PhantomData;

use uuid::Uuid;

use super::error::ApiError;
use super::query::ListQuery;
use super::response::{ItemResponse, ListResponse};
use crate::repository::{AssociationMutator, Entity, PageLimits, Repository, SqlRepository};

/// Standard REST CRUD handler trait
///
/// # Type Parameters
///
/// - `E`: The entity served by this handler. Creation takes the full entity
///   (its id is assigned on save), updates take `E::Patch`.
pub trait CollectionHandler<E: Entity>: Send + Sync {
    /// List entities with pagination, filtering, and sorting
    ///
    /// Malformed query input is rejected with a 400 before storage is touched.
    fn list(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = Result<ListResponse<E>, ApiError>> + Send;

    /// Get a single entity by its identifier
    ///
    /// # Errors
    ///
    /// Returns `ApiError` with `NotFound` kind if the entity doesn't exist.
    fn get(&self, id: Uuid) -> impl Future<Output = Result<ItemResponse<E>, ApiError>> + Send;

    /// Create a new entity
    ///
    /// # Errors
    ///
    /// Returns `Unprocessable` with the conflicting field when a unique value
    /// is already taken.
    fn create(&self, entity: E) -> impl Future<Output = Result<ItemResponse<E>, ApiError>> + Send;

    /// Apply a partial update
    fn update(
        &self,
        id: Uuid,
        patch: E::Patch,
    ) -> impl Future<Output = Result<ItemResponse<E>, ApiError>> + Send;

    /// Delete an entity
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Handler operations for many-to-many associations
pub trait AssociationHandler<E: Entity>: CollectionHandler<E> {
    /// Link `related` to the owner and return the refreshed owner
    fn attach(
        &self,
        id: Uuid,
        association: &str,
        related: Vec<Uuid>,
    ) -> impl Future<Output = Result<ItemResponse<E>, ApiError>> + Send;

    /// Unlink `related` from the owner and return the refreshed owner
    fn detach(
        &self,
        id: Uuid,
        association: &str,
        related: Vec<Uuid>,
    ) -> impl Future<Output = Result<ItemResponse<E>, ApiError>> + Send;
}

/// Generic handler serving one entity through a repository
///
/// Cheap to clone, so it can sit in axum state directly.
#[derive(Debug)]
pub struct ResourceHandler<E, R = SqlRepository<E>> {
    repository: R,
    limits: PageLimits,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R: Clone> Clone for ResourceHandler<E, R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            limits: self.limits,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, R: Repository<E>> ResourceHandler<E, R> {
    /// Serve `repository` with the given per-page bounds
    pub fn new(repository: R, limits: PageLimits) -> Self {
        Self {
            repository,
            limits,
            _entity: PhantomData,
        }
    }

    /// The underlying repository
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Per-page bounds applied to list queries
    pub fn limits(&self) -> PageLimits {
        self.limits
    }
}

impl<E: Entity, R: Repository<E>> CollectionHandler<E> for ResourceHandler<E, R> {
    async fn list(&self, query: ListQuery) -> Result<ListResponse<E>, ApiError> {
        let params = query.to_parameters(E::filter_spec(), self.limits)?;
        let page = self.repository.get_many(&params).await?;
        Ok(page.into())
    }

    async fn get(&self, id: Uuid) -> Result<ItemResponse<E>, ApiError> {
        let entity = self.repository.get_one(id).await?;
        Ok(ItemResponse::new(entity))
    }

    async fn create(&self, entity: E) -> Result<ItemResponse<E>, ApiError> {
        let entity = self.repository.save(entity).await?;
        Ok(ItemResponse::new(entity))
    }

    async fn update(&self, id: Uuid, patch: E::Patch) -> Result<ItemResponse<E>, ApiError> {
        let entity = self.repository.update(id, patch).await?;
        Ok(ItemResponse::new(entity))
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.repository.delete(id).await?;
        Ok(())
    }
}

impl<E: Entity, R: AssociationMutator<E>> AssociationHandler<E> for ResourceHandler<E, R> {
    async fn attach(
        &self,
        id: Uuid,
        association: &str,
        related: Vec<Uuid>,
    ) -> Result<ItemResponse<E>, ApiError> {
        let entity = self.repository.attach(id, association, &related).await?;
        Ok(ItemResponse::new(entity))
    }

    async fn detach(
        &self,
        id: Uuid,
        association: &str,
        related: Vec<Uuid>,
    ) -> Result<ItemResponse<E>, ApiError> {
        let entity = self.repository.detach(id, association, &related).await?;
        Ok(ItemResponse::new(entity))
    }
}
