//! Response types for REST handlers
//!
//! Single items serialize as `{"data": {...}}`; pages serialize as
//! `{"data": [...], "meta": {"page", "per_page", "total", "total_pages"}}`.
//!
//! # Example
//!
//! ```rust
//! use transit_service::handlers::{ItemResponse, ListResponse};
//! use transit_service::repository::Meta;
//!
//! let item = ItemResponse::new("JKT-BDG");
//! assert_eq!(item.data, "JKT-BDG");
//!
//! let page = ListResponse::new(vec!["JKT-BDG", "JKT-SMG"], Meta::from_parts(1, 20, 2));
//! assert_eq!(page.meta.total_pages, 1);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::repository::Meta;

/// Response wrapper for a single item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemResponse<T> {
    /// The item data
    pub data: T,
}

impl<T> ItemResponse<T> {
    /// Wrap an item
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Transform the data while keeping the envelope
    pub fn map<U, F>(self, f: F) -> ItemResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ItemResponse { data: f(self.data) }
    }
}

impl<T: Serialize> IntoResponse for ItemResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response wrapper for one page of a list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Pagination envelope
    pub meta: Meta,
}

impl<T> ListResponse<T> {
    /// Wrap a page of items
    pub fn new(data: Vec<T>, meta: Meta) -> Self {
        Self { data, meta }
    }

    /// Transform each item while keeping the envelope
    ///
    /// ```rust
    /// use transit_service::handlers::ListResponse;
    /// use transit_service::repository::Meta;
    ///
    /// let page = ListResponse::new(vec![1, 2, 3], Meta::from_parts(1, 3, 9));
    /// let labels = page.map(|n| format!("seat-{n}"));
    /// assert_eq!(labels.data[2], "seat-3");
    /// assert_eq!(labels.meta.total, 9);
    /// ```
    pub fn map<U, F>(self, f: F) -> ListResponse<U>
    where
        F: FnMut(T) -> U,
    {
        ListResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    /// Whether this page holds no items
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> From<(Vec<T>, Meta)> for ListResponse<T> {
    fn from((data, meta): (Vec<T>, Meta)) -> Self {
        Self::new(data, meta)
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
