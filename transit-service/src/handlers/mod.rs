//! Handler traits for REST CRUD patterns
//!
//! This module provides handler-level abstractions for the standard REST
//! collection pattern (list, get, create, update, delete) plus association
//! attach/detach. It builds on the repository traits to provide HTTP-aware
//! error handling and response types.
//!
//! # Features
//!
//! - **CRUD Handlers**: [`CollectionHandler`] trait for standard REST operations
//! - **Associations**: [`AssociationHandler`] for many-to-many link endpoints
//! - **Generic implementation**: [`ResourceHandler`] serves any entity
//! - **Pagination**: [`ListQuery`] and [`ListResponse`] for paginated list endpoints
//! - **Error Handling**: [`ApiError`] with automatic HTTP status code mapping
//!
//! # Integration with Axum
//!
//! The response types implement `IntoResponse`, so they can be returned directly
//! from Axum handlers:
//!
//! ```rust,ignore
//! use axum::{extract::{Path, Query, State}, Json};
//! use transit_service::entities::{Route, RoutePatch};
//! use transit_service::handlers::{ApiError, CollectionHandler, ListQuery, ResourceHandler};
//!
//! async fn list_routes(
//!     State(handler): State<ResourceHandler<Route>>,
//!     Query(query): Query<ListQuery>,
//! ) -> Result<impl IntoResponse, ApiError> {
//!     handler.list(query).await
//! }
//!
//! async fn update_route(
//!     State(handler): State<ResourceHandler<Route>>,
//!     Path(id): Path<Uuid>,
//!     Json(patch): Json<RoutePatch>,
//! ) -> Result<impl IntoResponse, ApiError> {
//!     handler.update(id, patch).await
//! }
//! ```

mod error;
mod query;
mod response;
mod traits;

// Re-export all public types
pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use query::ListQuery;
pub use response::{ItemResponse, ListResponse};
pub use traits::{AssociationHandler, CollectionHandler, ResourceHandler};
