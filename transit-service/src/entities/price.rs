//! Price entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{set_if_present, Entity, FieldKind, FilterField, FilterSpec, Patch, Value};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("label", FieldKind::Text),
    FilterField::new("amount_cents", FieldKind::Integer),
    FilterField::new("currency", FieldKind::Text),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

/// A fare that can be attached to routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Price {
    pub id: Uuid,
    pub label: String,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Price {
    pub fn new(label: impl Into<String>, amount_cents: i64, currency: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            label: label.into(),
            amount_cents,
            currency: currency.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricePatch {
    pub label: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

impl Patch for PricePatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "label", self.label.clone());
        set_if_present(&mut changes, "amount_cents", self.amount_cents);
        set_if_present(&mut changes, "currency", self.currency.clone());
        changes
    }
}

impl Entity for Price {
    type Patch = PricePatch;

    const NAME: &'static str = "Price";
    const TABLE: &'static str = "prices";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("label", self.label.clone().into()),
            ("amount_cents", self.amount_cents.into()),
            ("currency", self.currency.clone().into()),
        ]
    }
}
