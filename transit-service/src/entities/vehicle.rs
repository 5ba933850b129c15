//! Vehicle entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{set_if_present, Entity, FieldKind, FilterField, FilterSpec, Patch, Value};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("plate_number", FieldKind::Text),
    FilterField::new("model", FieldKind::Text),
    FilterField::new("capacity", FieldKind::Integer),
    FilterField::new("active", FieldKind::Boolean),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

/// A vehicle in the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub capacity: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// An active vehicle ready to be saved
    pub fn new(plate_number: impl Into<String>, model: impl Into<String>, capacity: i64) -> Self {
        Self {
            id: Uuid::nil(),
            plate_number: plate_number.into(),
            model: model.into(),
            capacity,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Partial update for [`Vehicle`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehiclePatch {
    pub plate_number: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<i64>,
    pub active: Option<bool>,
}

impl Patch for VehiclePatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "plate_number", self.plate_number.clone());
        set_if_present(&mut changes, "model", self.model.clone());
        set_if_present(&mut changes, "capacity", self.capacity);
        set_if_present(&mut changes, "active", self.active);
        changes
    }
}

impl Entity for Vehicle {
    type Patch = VehiclePatch;

    const NAME: &'static str = "Vehicle";
    const TABLE: &'static str = "vehicles";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("plate_number", self.plate_number.clone().into()),
            ("model", self.model.clone().into()),
            ("capacity", self.capacity.into()),
            ("active", self.active.into()),
        ]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["plate_number"]
    }
}
