//! Filter declarations, operators and bound values
//!
//! Each entity declares a static [`FilterSpec`]: the only field names that may
//! appear in a filter or sort. A [`FilterCondition`] can only be built from a
//! [`FilterField`] of that spec, so predicate text never contains client input;
//! client values travel separately as [`Value`]s bound to placeholders.
//!
//! # Example
//!
//! ```rust
//! use transit_service::repository::{FieldKind, FilterField, FilterSpec};
//!
//! static VEHICLE_FILTERS: FilterSpec = FilterSpec::new(&[
//!     FilterField::new("plate_number", FieldKind::Text),
//!     FilterField::new("capacity", FieldKind::Integer),
//! ]);
//!
//! assert!(VEHICLE_FILTERS.contains("capacity"));
//! assert!(!VEHICLE_FILTERS.contains("password"));
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parameters::ValidationError;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9, oldest first)
    #[default]
    Asc,
    /// Sort in descending order (Z-A, 9-0, newest first)
    Desc,
}

impl OrderDirection {
    /// Parse a direction token (`asc`/`desc`, case-insensitive)
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL `ORDER BY` keyword
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Declared storage type of a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Signed 64-bit integer
    Integer,
    /// Floating point number
    Float,
    /// `true`/`false`
    Boolean,
    /// Entity identifier
    Uuid,
    /// RFC 3339 timestamp
    Timestamp,
}

impl FieldKind {
    /// Parse a raw request string into a value of this kind
    ///
    /// ```rust
    /// use transit_service::repository::{FieldKind, Value};
    ///
    /// assert_eq!(FieldKind::Integer.parse("seats", "4").unwrap(), Value::Integer(4));
    /// assert!(FieldKind::Integer.parse("seats", "four").is_err());
    /// ```
    pub fn parse(&self, field: &str, raw: &str) -> Result<Value, ValidationError> {
        let raw = raw.trim();
        let invalid = || ValidationError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
        };
        match self {
            Self::Text => Ok(Value::Text(raw.to_string())),
            Self::Integer => raw.parse().map(Value::Integer).map_err(|_| invalid()),
            Self::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Float)
                .ok_or_else(invalid),
            Self::Boolean => parse_bool(raw).map(Value::Boolean).ok_or_else(invalid),
            Self::Uuid => Uuid::parse_str(raw).map(Value::Uuid).map_err(|_| invalid()),
            Self::Timestamp => DateTime::parse_from_rfc3339(raw)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| invalid()),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// A value bound to a placeholder in a query
///
/// Used both for filter operands and for column values on writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value
    Text(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Identifier value
    Uuid(Uuid),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// Operand list for `IN`
    List(Vec<Value>),
    /// SQL `NULL`
    Null,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Substring match (LIKE), text fields only
    Like,
    /// Value is in a list (IN)
    In,
    /// `IS NULL` for `true`, `IS NOT NULL` for `false`
    Null,
}

impl FilterOperator {
    /// Parse the operator suffix of a raw filter key (`capacity__gte`)
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "eq" => Some(Self::Equal),
            "ne" => Some(Self::NotEqual),
            "gt" => Some(Self::GreaterThan),
            "gte" => Some(Self::GreaterThanOrEqual),
            "lt" => Some(Self::LessThan),
            "lte" => Some(Self::LessThanOrEqual),
            "like" => Some(Self::Like),
            "in" => Some(Self::In),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Whether the operator may be applied to a field of `kind`
    #[must_use]
    pub fn supports(&self, kind: FieldKind) -> bool {
        match self {
            Self::Like => kind == FieldKind::Text,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual => {
                !matches!(kind, FieldKind::Boolean | FieldKind::Uuid)
            }
            _ => true,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::Null => write!(f, "IS NULL"),
        }
    }
}

/// A filterable field of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Column name
    pub name: &'static str,
    /// Storage type used to parse raw values
    pub kind: FieldKind,
}

impl FilterField {
    /// Declare a filterable and sortable field
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Whitelist of fields permitted in filter and sort input for one entity
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    fields: &'static [FilterField],
}

impl FilterSpec {
    /// Declare the whitelist
    #[must_use]
    pub const fn new(fields: &'static [FilterField]) -> Self {
        Self { fields }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&'static FilterField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is filterable
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// All declared fields
    pub fn fields(&self) -> &'static [FilterField] {
        self.fields
    }
}

/// Escape character for literal `%` and `_` in `LIKE` patterns
pub const LIKE_ESCAPE: char = '\\';

/// A single validated filter condition
///
/// The field reference is `'static` and always comes from a [`FilterSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The whitelisted field
    pub field: &'static FilterField,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The operand (a list for `IN`, a boolean for `Null`)
    pub value: Value,
}

impl FilterCondition {
    /// Write this condition as SQL with placeholders into `sink`
    pub fn write_to<S: PredicateSink>(&self, sink: &mut S) {
        let column = self.field.name;
        match (&self.operator, &self.value) {
            (FilterOperator::Null, Value::Boolean(false)) => {
                sink.push_sql(column);
                sink.push_sql(" IS NOT NULL");
            }
            (FilterOperator::Null, _) => {
                sink.push_sql(column);
                sink.push_sql(" IS NULL");
            }
            (FilterOperator::In, Value::List(items)) => {
                sink.push_sql(column);
                sink.push_sql(" IN (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        sink.push_sql(", ");
                    }
                    sink.push_value(item);
                }
                sink.push_sql(")");
            }
            (FilterOperator::Like, value) => {
                sink.push_sql(column);
                sink.push_sql(" LIKE ");
                sink.push_value(value);
                sink.push_sql(" ESCAPE '\\'");
            }
            (operator, value) => {
                sink.push_sql(column);
                sink.push_sql(&format!(" {} ", operator));
                sink.push_value(value);
            }
        }
    }
}

/// Receiver for predicate text and bound values
///
/// The same writer feeds both the executed query and the inspectable
/// `query_key` template, so the two cannot drift apart.
pub trait PredicateSink {
    /// Append literal SQL text (never client input)
    fn push_sql(&mut self, sql: &str);
    /// Append a placeholder bound to `value`
    fn push_value(&mut self, value: &Value);
}

/// Collects a `?`-placeholder template and its ordered values
#[derive(Debug, Default)]
pub struct TemplateSink {
    /// Predicate text
    pub template: String,
    /// Bound values, in placeholder order
    pub values: Vec<Value>,
}

impl PredicateSink for TemplateSink {
    fn push_sql(&mut self, sql: &str) {
        self.template.push_str(sql);
    }

    fn push_value(&mut self, value: &Value) {
        self.template.push('?');
        self.values.push(value.clone());
    }
}
