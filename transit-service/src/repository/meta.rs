//! Pagination metadata for list results
//!
//! [`Meta`] is computed from the [`Parameters`] that produced a page and the
//! total number of rows matching the same predicate.
//!
//! # Example
//!
//! ```rust
//! use transit_service::repository::{FieldKind, FilterField, FilterSpec, Meta, PageLimits, Parameters};
//!
//! static FILTERS: FilterSpec = FilterSpec::new(&[FilterField::new("label", FieldKind::Text)]);
//!
//! let params = Parameters::build(Vec::<(&str, &str)>::new(), "2", "5", "", &FILTERS, PageLimits::default())?;
//! let meta = Meta::new(&params, 7);
//! assert_eq!((meta.page, meta.per_page, meta.total, meta.total_pages), (2, 5, 7, 2));
//! # Ok::<(), transit_service::repository::ValidationError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::parameters::Parameters;

/// Page position and totals for a list result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    /// Requested page (1-indexed, not clamped to `total_pages`)
    pub page: u32,
    /// Items per page
    pub per_page: u32,
    /// Rows matching the filter across all pages
    pub total: u64,
    /// `ceil(total / per_page)`
    pub total_pages: u64,
}

impl Meta {
    /// Compute metadata for `params` given the total row count
    #[must_use]
    pub fn new(params: &Parameters, total: u64) -> Self {
        Self::from_parts(params.page(), params.per_page(), total)
    }

    /// Compute metadata from raw page numbers
    ///
    /// ```rust
    /// use transit_service::repository::Meta;
    ///
    /// let meta = Meta::from_parts(9, 20, 45);
    /// assert_eq!(meta.total_pages, 3);
    /// assert_eq!(meta.page, 9);
    /// assert!(!meta.has_next());
    /// ```
    #[must_use]
    pub fn from_parts(page: u32, per_page: u32, total: u64) -> Self {
        debug_assert!(per_page > 0, "per_page is validated to be positive");
        Self {
            page,
            per_page,
            total,
            total_pages: calculate_total_pages(total, per_page),
        }
    }

    /// Whether a page exists after this one
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    /// Whether a page exists before this one
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

fn calculate_total_pages(total: u64, per_page: u32) -> u64 {
    let per_page = u64::from(per_page.max(1));
    total.div_ceil(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(Meta::from_parts(1, 5, 0).total_pages, 0);
        assert_eq!(Meta::from_parts(1, 5, 1).total_pages, 1);
        assert_eq!(Meta::from_parts(1, 5, 5).total_pages, 1);
        assert_eq!(Meta::from_parts(1, 5, 6).total_pages, 2);
        assert_eq!(Meta::from_parts(1, 100, 1001).total_pages, 11);
    }

    #[test]
    fn test_seven_rows_second_page() {
        let meta = Meta::from_parts(2, 5, 7);
        assert_eq!(
            meta,
            Meta {
                page: 2,
                per_page: 5,
                total: 7,
                total_pages: 2
            }
        );
        assert!(meta.has_prev());
        assert!(!meta.has_next());
    }

    #[test]
    fn test_page_past_the_end_is_preserved() {
        let meta = Meta::from_parts(10, 5, 7);
        assert_eq!(meta.page, 10);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next());
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_value(Meta::from_parts(1, 20, 3)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 1, "per_page": 20, "total": 3, "total_pages": 1})
        );
    }
}
