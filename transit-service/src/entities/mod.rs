//! Transit booking entities
//!
//! Each entity declares its table, filterable fields, unique fields and
//! associations; storage behaviour comes from the generic
//! [`SqlRepository`].
//!
//! | Entity | Table | Unique | Associations |
//! |---|---|---|---|
//! | [`Route`] | `routes` | `code` | `prices` |
//! | [`Vehicle`] | `vehicles` | `plate_number` | |
//! | [`Driver`] | `drivers` | `license_number`, `phone` | `vehicles` |
//! | [`Price`] | `prices` | | |
//! | [`Order`] | `orders` | `reference` | `payments` |
//! | [`Payment`] | `payments` | `reference` | |

mod driver;
mod order;
mod payment;
mod price;
mod route;
mod vehicle;

pub use driver::{Driver, DriverPatch};
pub use order::{Order, OrderPatch};
pub use payment::{Payment, PaymentPatch};
pub use price::{Price, PricePatch};
pub use route::{Route, RoutePatch};
pub use vehicle::{Vehicle, VehiclePatch};

use sqlx::SqlitePool;

use crate::repository::SqlRepository;

/// Typed repositories over one shared pool
///
/// Hand this to handlers instead of reaching for a global connection.
#[derive(Debug, Clone)]
pub struct Repositories {
    pool: SqlitePool,
}

impl Repositories {
    /// Wrap an open pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The shared pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn routes(&self) -> SqlRepository<Route> {
        SqlRepository::new(self.pool.clone())
    }

    pub fn vehicles(&self) -> SqlRepository<Vehicle> {
        SqlRepository::new(self.pool.clone())
    }

    pub fn drivers(&self) -> SqlRepository<Driver> {
        SqlRepository::new(self.pool.clone())
    }

    pub fn prices(&self) -> SqlRepository<Price> {
        SqlRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> SqlRepository<Order> {
        SqlRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> SqlRepository<Payment> {
        SqlRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repository::{AssociationMutator, Repository};

    #[tokio::test]
    async fn test_route_prices_round_trip() {
        let repos = Repositories::new(test_pool().await);
        let route = repos
            .routes()
            .save(Route::new("JKT-BDG", "Jakarta", "Bandung", 150.0))
            .await
            .unwrap();
        let economy = repos
            .prices()
            .save(Price::new("Economy", 120_000, "IDR"))
            .await
            .unwrap();
        let executive = repos
            .prices()
            .save(Price::new("Executive", 180_000, "IDR"))
            .await
            .unwrap();

        repos
            .routes()
            .attach(route.id, "prices", &[economy.id, executive.id])
            .await
            .unwrap();
        repos.prices().delete(executive.id).await.unwrap();

        let route = repos.routes().get_one(route.id).await.unwrap();
        assert_eq!(route.price_ids, vec![economy.id]);
    }
}
