//! Payment entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{
    set_if_present, set_nullable, Entity, FieldKind, FilterField, FilterSpec, Patch, Value,
};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("reference", FieldKind::Text),
    FilterField::new("amount_cents", FieldKind::Integer),
    FilterField::new("method", FieldKind::Text),
    FilterField::new("status", FieldKind::Text),
    FilterField::new("paid_at", FieldKind::Timestamp),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

/// A payment that can settle one or more orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub reference: String,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// A pending, unpaid payment
    pub fn new(reference: impl Into<String>, amount_cents: i64, method: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            reference: reference.into(),
            amount_cents,
            method: method.into(),
            status: "pending".to_string(),
            paid_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentPatch {
    pub reference: Option<String>,
    pub amount_cents: Option<i64>,
    pub method: Option<String>,
    pub status: Option<String>,
    /// `null` clears the settlement time
    #[serde(
        default,
        deserialize_with = "crate::repository::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub paid_at: Option<Option<DateTime<Utc>>>,
}

impl Patch for PaymentPatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "reference", self.reference.clone());
        set_if_present(&mut changes, "amount_cents", self.amount_cents);
        set_if_present(&mut changes, "method", self.method.clone());
        set_if_present(&mut changes, "status", self.status.clone());
        set_nullable(&mut changes, "paid_at", self.paid_at);
        changes
    }
}

impl Entity for Payment {
    type Patch = PaymentPatch;

    const NAME: &'static str = "Payment";
    const TABLE: &'static str = "payments";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("reference", self.reference.clone().into()),
            ("amount_cents", self.amount_cents.into()),
            ("method", self.method.clone().into()),
            ("status", self.status.clone().into()),
            ("paid_at", self.paid_at.into()),
        ]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["reference"]
    }
}
