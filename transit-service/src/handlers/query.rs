//! Query types for list operations
//!
//! [`ListQuery`] captures the raw query string of a list request. Every
//! value stays a string until [`ListQuery::to_parameters`] validates it
//! against an entity's filter spec, so malformed input surfaces as a
//! field-attributed 400 instead of an extractor rejection.
//!
//! # Example
//!
//! ```rust
//! use transit_service::handlers::ListQuery;
//! use transit_service::repository::{Entity, PageLimits};
//! use transit_service::entities::Order;
//!
//! let query = ListQuery::default()
//!     .with_page(2)
//!     .with_per_page(50)
//!     .with_sort("-created_at")
//!     .with_filter("status", "paid");
//!
//! let params = query.to_parameters(Order::filter_spec(), PageLimits::default())?;
//! assert_eq!(params.offset(), 50);
//! assert_eq!(params.query_key(), "status = ?");
//! # Ok::<(), transit_service::repository::ValidationError>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::repository::{FilterSpec, PageLimits, Parameters, ValidationError};

/// Query parameters for list operations
///
/// `page`, `per_page` and `sort` are reserved; every other key is treated
/// as a filter (`status=paid`, `seats__gte=2`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Page number (1-indexed). None defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Number of items per page. None uses the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<String>,

    /// Sort expression (`-seats`, `seats:desc`, `seats`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Remaining keys, one filter each
    #[serde(flatten)]
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page.to_string());
        self
    }

    /// Set the number of items per page
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.to_string());
        self
    }

    /// Set the sort expression
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Add a filter
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Validate into [`Parameters`] for an entity
    pub fn to_parameters(
        &self,
        spec: &FilterSpec,
        limits: PageLimits,
    ) -> Result<Parameters, ValidationError> {
        Parameters::build(
            &self.filters,
            self.page.as_deref().unwrap_or_default(),
            self.per_page.as_deref().unwrap_or_default(),
            self.sort.as_deref().unwrap_or_default(),
            spec,
            limits,
        )
    }
}
