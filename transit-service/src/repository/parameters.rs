//! Validated query parameters for list operations
//!
//! [`Parameters::build`] turns raw request strings (filters, page, per-page,
//! sort) into a bounded query descriptor. Anything not declared in the
//! entity's [`FilterSpec`] is rejected here, before a query is ever built.
//!
//! Raw filter keys are either a bare field (`status=paid`, equality) or a
//! field with an operator suffix (`seats__gte=2`, `status__in=paid,pending`,
//! `driver_id__null=true`).
//!
//! `like` is a literal, case-insensitive substring match: `%`, `_` and `\`
//! in the value match themselves. `in` splits its value on commas, so a text
//! value that itself contains a comma cannot be matched with `in`; use a
//! bare equality filter for it instead.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use transit_service::repository::{FieldKind, FilterField, FilterSpec, PageLimits, Parameters, Value};
//!
//! static ORDER_FILTERS: FilterSpec = FilterSpec::new(&[
//!     FilterField::new("status", FieldKind::Text),
//!     FilterField::new("seats", FieldKind::Integer),
//! ]);
//!
//! let filters = HashMap::from([
//!     ("status".to_string(), "paid".to_string()),
//!     ("seats__gte".to_string(), "2".to_string()),
//! ]);
//! let params = Parameters::build(&filters, "2", "10", "-seats", &ORDER_FILTERS, PageLimits::default())?;
//!
//! assert_eq!(params.query_key(), "seats >= ? AND status = ?");
//! assert_eq!(params.query_values(), vec![Value::Integer(2), Value::Text("paid".into())]);
//! assert_eq!(params.offset(), 10);
//! assert_eq!(params.order(), "seats desc");
//! # Ok::<(), transit_service::repository::ValidationError>(())
//! ```

use thiserror::Error;

use super::filter::{
    FieldKind, FilterCondition, FilterField, FilterOperator, FilterSpec, OrderDirection,
    PredicateSink, TemplateSink, Value, LIKE_ESCAPE,
};

/// Default number of items per page
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Maximum allowed items per page
pub const MAX_PER_PAGE: u32 = 100;

/// Separator between a field name and an operator suffix in a raw filter key
pub const OPERATOR_SEPARATOR: &str = "__";

/// Request input rejected before reaching storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Filter key names a field outside the entity's filter spec
    #[error("Field '{field}' cannot be used as a filter")]
    UnknownField { field: String },

    /// Filter key carries an unrecognized operator suffix
    #[error("Unknown filter operator in '{key}'")]
    UnknownOperator { key: String },

    /// Operator cannot be applied to the field's type
    #[error("Operator '{operator}' is not supported on field '{field}'")]
    OperatorNotSupported { field: String, operator: String },

    /// Raw value does not parse as the field's type
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    /// Sort names an unknown field or an unknown direction
    #[error("Cannot sort by '{sort}'")]
    InvalidSort { sort: String },

    /// Page is not a positive integer
    #[error("Invalid page '{value}'")]
    InvalidPage { value: String },

    /// Per-page is not a positive integer
    #[error("Invalid per page '{value}'")]
    InvalidPerPage { value: String },

    /// Per-page is above the configured ceiling
    #[error("Per page {requested} exceeds the maximum of {max}")]
    PerPageExceeded { requested: u32, max: u32 },

    /// Association name is not declared by the owner entity
    #[error("Unknown association '{name}'")]
    UnknownAssociation { name: String },
}

impl ValidationError {
    /// The request field this error is attributed to
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownField { field }
            | Self::OperatorNotSupported { field, .. }
            | Self::InvalidValue { field, .. } => field,
            Self::UnknownOperator { key } => key,
            Self::InvalidSort { .. } => "sort",
            Self::InvalidPage { .. } => "page",
            Self::InvalidPerPage { .. } | Self::PerPageExceeded { .. } => "per_page",
            Self::UnknownAssociation { .. } => "association",
        }
    }

    /// Message key shown next to the field
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::UnknownField { .. } => "unknown field",
            Self::UnknownOperator { .. } => "unknown operator",
            Self::OperatorNotSupported { .. } => "operator not supported",
            Self::InvalidValue { .. } => "invalid value",
            Self::InvalidSort { .. } => "invalid sort",
            Self::InvalidPage { .. } => "invalid page",
            Self::InvalidPerPage { .. } => "invalid per page",
            Self::PerPageExceeded { .. } => "per page limit exceeded",
            Self::UnknownAssociation { .. } => "unknown association",
        }
    }
}

/// Per-page bounds applied while building parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when the request does not specify a per-page value
    pub default_per_page: u32,
    /// Requests above this are rejected
    pub max_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

/// A validated, bounded query descriptor
///
/// Built once per list request and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    conditions: Vec<FilterCondition>,
    page: u32,
    per_page: u32,
    order: Option<(&'static FilterField, OrderDirection)>,
}

impl Parameters {
    /// Validate raw request input against `spec`
    ///
    /// Empty `raw_page`, `raw_per_page` or `raw_sort` mean "use the default".
    /// Filters are processed in key order, so the same input always yields
    /// the same `query_key`.
    pub fn build<I, K, V>(
        raw_filters: I,
        raw_page: &str,
        raw_per_page: &str,
        raw_sort: &str,
        spec: &FilterSpec,
        limits: PageLimits,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw_filters: Vec<(K, V)> = raw_filters.into_iter().collect();
        raw_filters.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

        let conditions = raw_filters
            .iter()
            .map(|(key, value)| parse_condition(key.as_ref(), value.as_ref(), spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            conditions,
            page: parse_page(raw_page)?,
            per_page: parse_per_page(raw_per_page, limits)?,
            order: parse_sort(raw_sort, spec)?,
        })
    }

    /// Parameters with no filters, for the first page under `limits`
    #[must_use]
    pub fn unfiltered(spec: &FilterSpec, limits: PageLimits) -> Self {
        Self {
            conditions: Vec::new(),
            page: 1,
            per_page: limits.default_per_page,
            order: default_order(spec),
        }
    }

    /// 1-indexed page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Row limit for the bounded select
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.per_page
    }

    /// Rows skipped before the current page
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Validated filter conditions
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// Validated sort column and direction
    pub fn order_by(&self) -> Option<(&'static str, OrderDirection)> {
        self.order.map(|(field, direction)| (field.name, direction))
    }

    /// `"field direction"`, or empty when unordered
    pub fn order(&self) -> String {
        self.order_by()
            .map(|(field, direction)| format!("{} {}", field, direction))
            .unwrap_or_default()
    }

    /// Filter expression template with `?` placeholders
    pub fn query_key(&self) -> String {
        let mut sink = TemplateSink::default();
        self.write_conditions(&mut sink);
        sink.template
    }

    /// Values bound to the placeholders of [`query_key`](Self::query_key), in order
    pub fn query_values(&self) -> Vec<Value> {
        let mut sink = TemplateSink::default();
        self.write_conditions(&mut sink);
        sink.values
    }

    /// Write ` WHERE …` (or nothing) into `sink`
    pub fn write_predicate<S: PredicateSink>(&self, sink: &mut S) {
        if !self.conditions.is_empty() {
            sink.push_sql(" WHERE ");
            self.write_conditions(sink);
        }
    }

    fn write_conditions<S: PredicateSink>(&self, sink: &mut S) {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                sink.push_sql(" AND ");
            }
            condition.write_to(sink);
        }
    }
}

fn parse_condition(
    key: &str,
    raw: &str,
    spec: &FilterSpec,
) -> Result<FilterCondition, ValidationError> {
    let (field, operator) = match spec.field(key) {
        Some(field) => (field, FilterOperator::Equal),
        None => {
            let (name, suffix) = key
                .rsplit_once(OPERATOR_SEPARATOR)
                .ok_or_else(|| ValidationError::UnknownField {
                    field: key.to_string(),
                })?;
            let field = spec.field(name).ok_or_else(|| ValidationError::UnknownField {
                field: key.to_string(),
            })?;
            let operator =
                FilterOperator::from_suffix(suffix).ok_or_else(|| ValidationError::UnknownOperator {
                    key: key.to_string(),
                })?;
            (field, operator)
        }
    };

    if !operator.supports(field.kind) {
        return Err(ValidationError::OperatorNotSupported {
            field: field.name.to_string(),
            operator: operator.to_string(),
        });
    }

    let value = match operator {
        FilterOperator::In => parse_list(field, raw)?,
        FilterOperator::Null => FieldKind::Boolean.parse(field.name, raw)?,
        FilterOperator::Like => parse_like(field, raw)?,
        _ => field.kind.parse(field.name, raw)?,
    };

    Ok(FilterCondition {
        field,
        operator,
        value,
    })
}

fn parse_list(field: &FilterField, raw: &str) -> Result<Value, ValidationError> {
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| field.kind.parse(field.name, item))
        .collect::<Result<Vec<_>, _>>()?;
    if items.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.name.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(Value::List(items))
}

/// Wrap `raw` as a literal substring pattern for `LIKE ... ESCAPE '\'`
fn parse_like(field: &FilterField, raw: &str) -> Result<Value, ValidationError> {
    let needle = raw.trim();
    if needle.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.name.to_string(),
            value: raw.to_string(),
        });
    }
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, LIKE_ESCAPE | '%' | '_') {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    Ok(Value::Text(pattern))
}

fn parse_page(raw: &str) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }
    match raw.parse::<u32>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(ValidationError::InvalidPage {
            value: raw.to_string(),
        }),
    }
}

fn parse_per_page(raw: &str, limits: PageLimits) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(limits.default_per_page);
    }
    let per_page = match raw.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            return Err(ValidationError::InvalidPerPage {
                value: raw.to_string(),
            })
        }
    };
    if per_page > limits.max_per_page {
        return Err(ValidationError::PerPageExceeded {
            requested: per_page,
            max: limits.max_per_page,
        });
    }
    Ok(per_page)
}

fn parse_sort(
    raw: &str,
    spec: &FilterSpec,
) -> Result<Option<(&'static FilterField, OrderDirection)>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default_order(spec));
    }
    let invalid = || ValidationError::InvalidSort {
        sort: raw.to_string(),
    };

    let (name, direction) = if let Some(name) = raw.strip_prefix('-') {
        (name, OrderDirection::Desc)
    } else if let Some((name, token)) = raw
        .split_once(':')
        .or_else(|| raw.split_once(char::is_whitespace))
    {
        (name, OrderDirection::parse(token.trim()).ok_or_else(invalid)?)
    } else {
        (raw, OrderDirection::Asc)
    };

    let field = spec.field(name.trim()).ok_or_else(invalid)?;
    Ok(Some((field, direction)))
}

fn default_order(spec: &FilterSpec) -> Option<(&'static FilterField, OrderDirection)> {
    spec.field("created_at")
        .map(|field| (field, OrderDirection::Desc))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    static SPEC: FilterSpec = FilterSpec::new(&[
        FilterField::new("status", FieldKind::Text),
        FilterField::new("seats", FieldKind::Integer),
        FilterField::new("route_id", FieldKind::Uuid),
        FilterField::new("created_at", FieldKind::Timestamp),
    ]);

    static NO_TIMESTAMP: FilterSpec =
        FilterSpec::new(&[FilterField::new("label", FieldKind::Text)]);

    fn build(filters: &[(&str, &str)], page: &str, per_page: &str, sort: &str) -> Result<Parameters, ValidationError> {
        Parameters::build(
            filters.iter().copied(),
            page,
            per_page,
            sort,
            &SPEC,
            PageLimits::default(),
        )
    }

    #[test]
    fn test_defaults() {
        let params = build(&[], "", "", "").unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.query_key(), "");
        assert!(params.query_values().is_empty());
        assert_eq!(params.order(), "created_at desc");
    }

    #[test]
    fn test_no_default_order_without_created_at() {
        let params = Parameters::build(
            Vec::<(String, String)>::new(),
            "",
            "",
            "",
            &NO_TIMESTAMP,
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(params.order(), "");
        assert!(params.order_by().is_none());
    }

    #[test]
    fn test_unknown_filter_field_is_rejected() {
        let err = build(&[("password", "x")], "", "", "").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "password".to_string()
            }
        );
        assert_eq!(err.field(), "password");
    }

    #[test]
    fn test_unknown_field_with_operator_names_the_key() {
        let err = build(&[("secret__gte", "1")], "", "", "").unwrap_err();
        assert_eq!(err.field(), "secret__gte");
    }

    #[test]
    fn test_injection_attempt_in_key_is_rejected() {
        let err = build(&[("status = 'x' OR 1=1 --", "a")], "", "", "").unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn test_injection_attempt_in_value_is_bound() {
        let params = build(&[("status", "x' OR '1'='1")], "", "", "").unwrap();
        assert_eq!(params.query_key(), "status = ?");
        assert_eq!(params.query_values(), vec![Value::Text("x' OR '1'='1".into())]);
    }

    #[test]
    fn test_unknown_operator() {
        let err = build(&[("seats__between", "1")], "", "", "").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownOperator {
                key: "seats__between".to_string()
            }
        );
    }

    #[test]
    fn test_operator_not_supported() {
        let err = build(&[("seats__like", "1")], "", "", "").unwrap_err();
        assert!(matches!(err, ValidationError::OperatorNotSupported { .. }));
        assert_eq!(err.field(), "seats");
    }

    #[test]
    fn test_invalid_value() {
        let err = build(&[("seats", "two")], "", "", "").unwrap_err();
        assert_eq!(err.message_key(), "invalid value");
    }

    #[test]
    fn test_filters_are_ordered_by_key() {
        let filters = HashMap::from([
            ("status".to_string(), "paid".to_string()),
            ("route_id__null".to_string(), "false".to_string()),
            ("seats__lt".to_string(), "5".to_string()),
        ]);
        let params =
            Parameters::build(&filters, "", "", "", &SPEC, PageLimits::default()).unwrap();
        assert_eq!(
            params.query_key(),
            "route_id IS NOT NULL AND seats < ? AND status = ?"
        );
        assert_eq!(
            params.query_values(),
            vec![Value::Integer(5), Value::Text("paid".into())]
        );
    }

    #[test]
    fn test_in_and_like() {
        let params = build(&[("status__in", "paid, pending"), ("status__like", "pa")], "", "", "")
            .unwrap();
        assert_eq!(
            params.query_key(),
            "status IN (?, ?) AND status LIKE ? ESCAPE '\\'"
        );
        assert_eq!(params.query_values()[2], Value::Text("%pa%".into()));
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let params = build(&[("status__like", r"50%_off\")], "", "", "").unwrap();
        assert_eq!(
            params.query_values(),
            vec![Value::Text(r"%50\%\_off\\%".into())]
        );
    }

    #[test]
    fn test_empty_like_is_invalid() {
        let err = build(&[("status__like", "  ")], "", "", "").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                field: "status".into(),
                value: "  ".into()
            }
        );
    }

    #[test]
    fn test_in_splits_on_every_comma() {
        let params = build(&[("status__in", "paid,on hold, late")], "", "", "").unwrap();
        assert_eq!(
            params.query_values(),
            vec![Value::List(vec![
                Value::Text("paid".into()),
                Value::Text("on hold".into()),
                Value::Text("late".into()),
            ])]
        );
    }

    #[test]
    fn test_empty_in_list_is_invalid() {
        let err = build(&[("status__in", " , ")], "", "", "").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_per_page_over_limit_is_rejected_not_clamped() {
        let err = build(&[], "", "101", "").unwrap_err();
        assert_eq!(
            err,
            ValidationError::PerPageExceeded {
                requested: 101,
                max: MAX_PER_PAGE
            }
        );
        assert_eq!(err.field(), "per_page");
        assert_eq!(err.message_key(), "per page limit exceeded");
    }

    #[test]
    fn test_per_page_at_limit_is_accepted() {
        let params = build(&[], "", "100", "").unwrap();
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_custom_limits() {
        let limits = PageLimits {
            default_per_page: 5,
            max_per_page: 10,
        };
        let params =
            Parameters::build(Vec::<(&str, &str)>::new(), "", "", "", &SPEC, limits).unwrap();
        assert_eq!(params.per_page(), 5);
        assert!(Parameters::build(Vec::<(&str, &str)>::new(), "", "11", "", &SPEC, limits).is_err());
    }

    #[test]
    fn test_invalid_page_and_per_page() {
        assert!(matches!(
            build(&[], "0", "", "").unwrap_err(),
            ValidationError::InvalidPage { .. }
        ));
        assert!(matches!(
            build(&[], "abc", "", "").unwrap_err(),
            ValidationError::InvalidPage { .. }
        ));
        assert!(matches!(
            build(&[], "", "0", "").unwrap_err(),
            ValidationError::InvalidPerPage { .. }
        ));
        assert!(matches!(
            build(&[], "", "-5", "").unwrap_err(),
            ValidationError::InvalidPerPage { .. }
        ));
    }

    #[test]
    fn test_offset() {
        let params = build(&[], "3", "50", "").unwrap();
        assert_eq!(params.offset(), 100);
    }

    #[test]
    fn test_sort_forms() {
        assert_eq!(build(&[], "", "", "seats").unwrap().order(), "seats asc");
        assert_eq!(build(&[], "", "", "-seats").unwrap().order(), "seats desc");
        assert_eq!(build(&[], "", "", "seats desc").unwrap().order(), "seats desc");
        assert_eq!(build(&[], "", "", "seats:ASC").unwrap().order(), "seats asc");
    }

    #[test]
    fn test_sort_rejects_unknown_field_and_direction() {
        assert_eq!(
            build(&[], "", "", "password").unwrap_err(),
            ValidationError::InvalidSort {
                sort: "password".to_string()
            }
        );
        assert!(build(&[], "", "", "seats sideways").is_err());
        assert!(build(&[], "", "", "seats; DROP TABLE orders").is_err());
    }

    #[test]
    fn test_unfiltered() {
        let params = Parameters::unfiltered(&SPEC, PageLimits::default());
        assert!(params.conditions().is_empty());
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn test_write_predicate() {
        let params = build(&[("seats", "2")], "", "", "").unwrap();
        let mut sink = TemplateSink::default();
        params.write_predicate(&mut sink);
        assert_eq!(sink.template, " WHERE seats = ?");
    }
}
