//! Route entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{
    set_if_present, Association, Entity, FieldKind, FilterField, FilterSpec, Patch, Value,
};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("code", FieldKind::Text),
    FilterField::new("origin", FieldKind::Text),
    FilterField::new("destination", FieldKind::Text),
    FilterField::new("distance_km", FieldKind::Float),
    FilterField::new("active", FieldKind::Boolean),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

static ASSOCIATIONS: [Association; 1] =
    [Association::new("prices", "route_prices", "route_id", "price_id")];

/// A scheduled connection between two stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: Uuid,
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Attached prices
    #[sqlx(skip)]
    #[serde(default)]
    pub price_ids: Vec<Uuid>,
}

impl Route {
    /// An active route ready to be saved
    pub fn new(
        code: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        distance_km: f64,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            code: code.into(),
            origin: origin.into(),
            destination: destination.into(),
            distance_km,
            active: true,
            created_at: Utc::now(),
            price_ids: Vec::new(),
        }
    }
}

/// Partial update for [`Route`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutePatch {
    pub code: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
    pub active: Option<bool>,
}

impl Patch for RoutePatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "code", self.code.clone());
        set_if_present(&mut changes, "origin", self.origin.clone());
        set_if_present(&mut changes, "destination", self.destination.clone());
        set_if_present(&mut changes, "distance_km", self.distance_km);
        set_if_present(&mut changes, "active", self.active);
        changes
    }
}

impl Entity for Route {
    type Patch = RoutePatch;

    const NAME: &'static str = "Route";
    const TABLE: &'static str = "routes";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("code", self.code.clone().into()),
            ("origin", self.origin.clone().into()),
            ("destination", self.destination.clone().into()),
            ("distance_km", self.distance_km.into()),
            ("active", self.active.into()),
        ]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["code"]
    }

    fn associations() -> &'static [Association] {
        &ASSOCIATIONS
    }

    fn set_related(&mut self, association: &str, ids: Vec<Uuid>) {
        if association == "prices" {
            self.price_ids = ids;
        }
    }
}
