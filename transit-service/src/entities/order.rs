//! Order (booking) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::repository::{
    set_if_present, Association, Entity, FieldKind, FilterField, FilterSpec, Patch, Value,
};

static FILTERS: FilterSpec = FilterSpec::new(&[
    FilterField::new("reference", FieldKind::Text),
    FilterField::new("route_id", FieldKind::Uuid),
    FilterField::new("customer_name", FieldKind::Text),
    FilterField::new("seats", FieldKind::Integer),
    FilterField::new("status", FieldKind::Text),
    FilterField::new("total_cents", FieldKind::Integer),
    FilterField::new("created_at", FieldKind::Timestamp),
]);

static ASSOCIATIONS: [Association; 1] =
    [Association::new("payments", "order_payments", "order_id", "payment_id")];

/// A seat booking on a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub reference: String,
    pub route_id: Uuid,
    pub customer_name: String,
    pub seats: i64,
    pub status: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    /// Payments settling this order
    #[sqlx(skip)]
    #[serde(default)]
    pub payment_ids: Vec<Uuid>,
}

impl Order {
    /// A pending order ready to be saved
    pub fn new(
        reference: impl Into<String>,
        route_id: Uuid,
        customer_name: impl Into<String>,
        seats: i64,
        total_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            reference: reference.into(),
            route_id,
            customer_name: customer_name.into(),
            seats,
            status: "pending".to_string(),
            total_cents,
            created_at: Utc::now(),
            payment_ids: Vec::new(),
        }
    }
}

/// Partial update for [`Order`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    pub reference: Option<String>,
    pub route_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub seats: Option<i64>,
    pub status: Option<String>,
    pub total_cents: Option<i64>,
}

impl Patch for OrderPatch {
    fn changes(&self) -> Vec<(&'static str, Value)> {
        let mut changes = Vec::new();
        set_if_present(&mut changes, "reference", self.reference.clone());
        set_if_present(&mut changes, "route_id", self.route_id);
        set_if_present(&mut changes, "customer_name", self.customer_name.clone());
        set_if_present(&mut changes, "seats", self.seats);
        set_if_present(&mut changes, "status", self.status.clone());
        set_if_present(&mut changes, "total_cents", self.total_cents);
        changes
    }
}

impl Entity for Order {
    type Patch = OrderPatch;

    const NAME: &'static str = "Order";
    const TABLE: &'static str = "orders";

    fn filter_spec() -> &'static FilterSpec {
        &FILTERS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("reference", self.reference.clone().into()),
            ("route_id", self.route_id.into()),
            ("customer_name", self.customer_name.clone().into()),
            ("seats", self.seats.into()),
            ("status", self.status.clone().into()),
            ("total_cents", self.total_cents.into()),
        ]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["reference"]
    }

    fn associations() -> &'static [Association] {
        &ASSOCIATIONS
    }

    fn set_related(&mut self, association: &str, ids: Vec<Uuid>) {
        if association == "payments" {
            self.payment_ids = ids;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::entities::{Repositories, Route};
    use crate::repository::{PageLimits, Parameters, Repository, RepositoryErrorKind};

    #[tokio::test]
    async fn test_filter_by_owned_foreign_key() {
        let repos = Repositories::new(test_pool().await);
        let routes = repos.routes();
        let orders = repos.orders();
        let north = routes
            .save(Route::new("N-1", "Medan", "Binjai", 22.0))
            .await
            .unwrap();
        let south = routes
            .save(Route::new("S-1", "Bogor", "Depok", 30.5))
            .await
            .unwrap();
        for (i, route) in [north.id, north.id, south.id].into_iter().enumerate() {
            orders
                .save(Order::new(format!("ORD-{}", i), route, "Sari", 1, 50_000))
                .await
                .unwrap();
        }

        let route_filter = north.id.to_string();
        let params = Parameters::build(
            [("route_id", route_filter.as_str())],
            "",
            "",
            "",
            Order::filter_spec(),
            PageLimits::default(),
        )
        .unwrap();
        let (items, meta) = orders.get_many(&params).await.unwrap();
        assert_eq!(meta.total, 2);
        assert!(items.iter().all(|o| o.route_id == north.id));
    }

    #[tokio::test]
    async fn test_order_for_missing_route_is_internal() {
        let repos = Repositories::new(test_pool().await);
        let err = repos
            .orders()
            .save(Order::new("ORD-1", Uuid::new_v4(), "Sari", 1, 50_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Internal);
        assert!(!err.has_fields());
    }
}
