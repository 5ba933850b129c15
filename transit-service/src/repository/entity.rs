//! Entity and association declarations
//!
//! The generic [`SqlRepository`](super::SqlRepository) knows nothing about a
//! concrete table. Each entity describes itself through [`Entity`]: its table,
//! its writable columns, which fields may be filtered, which fields are unique,
//! and which many-to-many associations it owns.
//!
//! Every entity table has an `id` primary key (UUID, assigned on save) and a
//! `created_at` timestamp (set on save). Neither appears in
//! [`Entity::columns`].

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use uuid::Uuid;

use super::filter::{FilterSpec, Value};

/// A many-to-many relation stored in a link table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    /// Name used by callers (e.g. `"payments"`)
    pub name: &'static str,
    /// Link table
    pub table: &'static str,
    /// Column holding the owner's id
    pub owner_column: &'static str,
    /// Column holding the related entity's id
    pub related_column: &'static str,
    /// Whether `get_one` resolves this association eagerly
    pub preload: bool,
}

impl Association {
    /// Declare an eagerly loaded association
    #[must_use]
    pub const fn new(
        name: &'static str,
        table: &'static str,
        owner_column: &'static str,
        related_column: &'static str,
    ) -> Self {
        Self {
            name,
            table,
            owner_column,
            related_column,
            preload: true,
        }
    }

    /// Do not resolve this association on `get_one`
    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.preload = false;
        self
    }
}

/// A persisted record managed by the generic repository
pub trait Entity:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Clone + Send + Sync + Unpin + 'static
{
    /// Partial update accepted by `update`
    type Patch: Patch;

    /// Display name used in errors and logs
    const NAME: &'static str;

    /// Storage table
    const TABLE: &'static str;

    /// Fields accepted in filter and sort input
    fn filter_spec() -> &'static FilterSpec;

    /// Identifier
    fn id(&self) -> Uuid;

    /// Writable columns and their values, excluding `id` and `created_at`
    fn columns(&self) -> Vec<(&'static str, Value)>;

    /// Columns backed by a unique index
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    /// Many-to-many relations owned by this entity
    fn associations() -> &'static [Association] {
        &[]
    }

    /// Look up an association by name
    fn association(name: &str) -> Option<&'static Association> {
        Self::associations().iter().find(|a| a.name == name)
    }

    /// Store the resolved related ids of an association
    fn set_related(&mut self, _association: &str, _ids: Vec<Uuid>) {}
}

/// Changes to apply to an existing entity
///
/// Only fields present in the patch are written.
pub trait Patch: Send + Sync {
    /// Columns to set and their new values
    fn changes(&self) -> Vec<(&'static str, Value)>;

    /// Whether the patch changes nothing
    fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }
}

/// Push `(column, value)` onto `changes` when `value` is present
///
/// ```rust
/// use transit_service::repository::{set_if_present, Value};
///
/// let mut changes = Vec::new();
/// set_if_present(&mut changes, "seats", Some(3_i64));
/// set_if_present(&mut changes, "status", None::<String>);
/// assert_eq!(changes, vec![("seats", Value::Integer(3))]);
/// ```
pub fn set_if_present<T: Into<Value>>(
    changes: &mut Vec<(&'static str, Value)>,
    column: &'static str,
    value: Option<T>,
) {
    if let Some(value) = value {
        changes.push((column, value.into()));
    }
}

/// Push `(column, value)` for a nullable column
///
/// `None` leaves the column alone, `Some(None)` clears it to `NULL`.
///
/// ```rust
/// use transit_service::repository::{set_nullable, Value};
///
/// let mut changes = Vec::new();
/// set_nullable(&mut changes, "paid_at", None::<Option<i64>>);
/// set_nullable(&mut changes, "driver_id", Some(None::<i64>));
/// assert_eq!(changes, vec![("driver_id", Value::Null)]);
/// ```
pub fn set_nullable<T: Into<Value>>(
    changes: &mut Vec<(&'static str, Value)>,
    column: &'static str,
    value: Option<Option<T>>,
) {
    if let Some(value) = value {
        changes.push((column, value.map_or(Value::Null, Into::into)));
    }
}

/// Deserialize a present field, including an explicit `null`, as `Some`
///
/// Pair with `#[serde(default)]` so a missing field stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
