//! Driver entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{
    set_if_present, Association, Entity, FieldKind, FilterField, FilterSpec, Patch, Value,
};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("name", FieldKind::Text),
    FilterField::new("license_number", FieldKind::Text),
    FilterField::new("phone", FieldKind::Text),
    FilterField::new("active", FieldKind::Boolean),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

static ASSOCIATIONS: [Association; 1] =
    [Association::new("vehicles", "driver_vehicles", "driver_id", "vehicle_id")];

/// A licensed driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Vehicles the driver is assigned to
    #[sqlx(skip)]
    #[serde(default)]
    pub vehicle_ids: Vec<Uuid>,
}

impl Driver {
    pub fn new(
        name: impl Into<String>,
        license_number: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            license_number: license_number.into(),
            phone: phone.into(),
            active: true,
            created_at: Utc::now(),
            vehicle_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverPatch {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

impl Patch for DriverPatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "name", self.name.clone());
        set_if_present(&mut changes, "license_number", self.license_number.clone());
        set_if_present(&mut changes, "phone", self.phone.clone());
        set_if_present(&mut changes, "active", self.active);
        changes
    }
}

impl Entity for Driver {
    type Patch = DriverPatch;

    const NAME: &'static str = "Driver";
    const TABLE: &'static str = "drivers";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("license_number", self.license_number.clone().into()),
            ("phone", self.phone.clone().into()),
            ("active", self.active.into()),
        ]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["license_number", "phone"]
    }

    fn associations() -> &'static [Association] {
        &ASSOCIATIONS
    }

    fn set_related(&mut self, association: &str, ids: Vec<Uuid>) {
        if association == "vehicles" {
            self.vehicle_ids = ids;
        }
    }
}
