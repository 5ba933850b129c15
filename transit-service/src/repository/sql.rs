//! Generic SQLite-backed repository
//!
//! [`SqlRepository`] implements [`Repository`] and [`AssociationMutator`] for
//! any [`Entity`]. Table and column names come only from the entity's static
//! declarations; every client-supplied value is bound.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::classify::{classify, constraint_field, StorageFailure};
use super::entity::{Association, Entity, Patch};
use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::filter::{PredicateSink, Value};
use super::meta::Meta;
use super::parameters::{Parameters, ValidationError};
use super::traits::{AssociationMutator, Repository, RepositoryResult};

impl<'args> PredicateSink for QueryBuilder<'args, Sqlite> {
    fn push_sql(&mut self, sql: &str) {
        self.push(sql);
    }

    fn push_value(&mut self, value: &Value) {
        bind_value(self, value.clone());
    }
}

fn bind_value(builder: &mut QueryBuilder<'_, Sqlite>, value: Value) {
    match value {
        Value::Text(s) => {
            builder.push_bind(s);
        }
        Value::Integer(n) => {
            builder.push_bind(n);
        }
        Value::Float(n) => {
            builder.push_bind(n);
        }
        Value::Boolean(b) => {
            builder.push_bind(b);
        }
        Value::Uuid(id) => {
            builder.push_bind(id);
        }
        Value::Timestamp(ts) => {
            builder.push_bind(ts);
        }
        Value::List(items) => {
            for (i, item) in items.into_iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                bind_value(builder, item);
            }
        }
        Value::Null => {
            builder.push_bind(None::<String>);
        }
    }
}

/// Repository for one entity type over a shared SQLite pool
pub struct SqlRepository<E> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SqlRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for SqlRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlRepository")
            .field("entity", &std::any::type_name::<E>())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> SqlRepository<E> {
    /// Create a repository backed by `pool`
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// The underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn not_found(&self, operation: RepositoryOperation, id: Uuid) -> RepositoryError {
        tracing::debug!(entity = E::NAME, %id, %operation, "Entity not found");
        RepositoryError::not_found(E::NAME, id.to_string()).with_operation(operation)
    }

    fn failure(
        &self,
        operation: RepositoryOperation,
        failure: &StorageFailure,
        conflicting_field: Option<&str>,
    ) -> RepositoryError {
        let err = classify(operation, failure, conflicting_field).with_entity_type(E::NAME);
        match err.kind {
            RepositoryErrorKind::Internal => {
                tracing::error!(entity = E::NAME, %operation, error = %err.message, "Storage failure");
            }
            _ => {
                tracing::debug!(entity = E::NAME, %operation, kind = %err.kind, fields = ?err.fields, "Storage rejected write");
            }
        }
        err
    }

    fn storage_failure(&self, operation: RepositoryOperation, err: sqlx::Error) -> RepositoryError {
        self.failure(operation, &StorageFailure::from(&err), None)
    }

    /// Classify a failed write, tracing a unique violation back to its field
    async fn write_failure(
        &self,
        operation: RepositoryOperation,
        err: sqlx::Error,
        submitted: &[(&'static str, Value)],
        exclude: Option<Uuid>,
    ) -> RepositoryError {
        let failure = StorageFailure::from(&err);
        let field = match &failure {
            StorageFailure::UniqueViolation { constraint } => {
                match constraint
                    .as_deref()
                    .and_then(|name| constraint_field(name, E::unique_fields()))
                {
                    Some(field) => Some(field),
                    None => self.probe_unique(submitted, exclude).await,
                }
            }
            _ => None,
        };
        self.failure(operation, &failure, field)
    }

    /// Find a submitted unique value already held by another row
    async fn probe_unique(
        &self,
        submitted: &[(&'static str, Value)],
        exclude: Option<Uuid>,
    ) -> Option<&'static str> {
        let unique = E::unique_fields();
        for (column, value) in submitted.iter().filter(|(c, _)| unique.contains(c)) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "SELECT 1 FROM {} WHERE {} = ",
                E::TABLE,
                column
            ));
            bind_value(&mut builder, value.clone());
            if let Some(id) = exclude {
                builder.push(" AND id != ").push_bind(id);
            }
            builder.push(" LIMIT 1");

            match builder.build().fetch_optional(&self.pool).await {
                Ok(Some(_)) => return Some(*column),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(entity = E::NAME, column = *column, error = %err, "Unique field probe failed");
                    return None;
                }
            }
        }
        None
    }

    fn association(
        &self,
        operation: RepositoryOperation,
        name: &str,
    ) -> RepositoryResult<&'static Association> {
        E::association(name).ok_or_else(|| {
            let err = ValidationError::UnknownAssociation {
                name: name.to_string(),
            };
            RepositoryError::validation(operation, &err).with_entity_type(E::NAME)
        })
    }

    async fn ensure_exists(
        &self,
        conn: &mut SqliteConnection,
        operation: RepositoryOperation,
        id: Uuid,
    ) -> RepositoryResult<()> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?", E::TABLE);
        let found: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| self.storage_failure(operation, e))?;
        found.map(|_| ()).ok_or_else(|| self.not_found(operation, id))
    }

    /// Load an entity and its preloaded associations on `conn`
    async fn load(
        &self,
        conn: &mut SqliteConnection,
        operation: RepositoryOperation,
        id: Uuid,
    ) -> RepositoryResult<E> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", E::TABLE);
        let found = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| self.storage_failure(operation, e))?;
        let mut entity = found.ok_or_else(|| self.not_found(operation, id))?;
        self.resolve_preloads(conn, operation, &mut entity).await?;
        Ok(entity)
    }

    async fn resolve_preloads(
        &self,
        conn: &mut SqliteConnection,
        operation: RepositoryOperation,
        entity: &mut E,
    ) -> RepositoryResult<()> {
        for association in E::associations().iter().filter(|a| a.preload) {
            let ids = fetch_related(&mut *conn, association, entity.id())
                .await
                .map_err(|e| self.storage_failure(operation, e))?;
            entity.set_related(association.name, ids);
        }
        Ok(())
    }

    /// Resolve preloaded associations for a whole page with one query each
    async fn resolve_page_preloads(
        &self,
        conn: &mut SqliteConnection,
        operation: RepositoryOperation,
        items: &mut [E],
    ) -> RepositoryResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let owners: Vec<Uuid> = items.iter().map(|item| item.id()).collect();
        for association in E::associations().iter().filter(|a| a.preload) {
            let mut related = fetch_related_many(&mut *conn, association, &owners)
                .await
                .map_err(|e| self.storage_failure(operation, e))?;
            for item in items.iter_mut() {
                let ids = related.remove(&item.id()).unwrap_or_default();
                item.set_related(association.name, ids);
            }
        }
        Ok(())
    }

    /// Load the owner after an association change, with that association refreshed
    async fn reload_owner(
        &self,
        conn: &mut SqliteConnection,
        operation: RepositoryOperation,
        association: &Association,
        id: Uuid,
    ) -> RepositoryResult<E> {
        let mut owner = self.load(&mut *conn, operation, id).await?;
        if !association.preload {
            let ids = fetch_related(&mut *conn, association, id)
                .await
                .map_err(|e| self.storage_failure(operation, e))?;
            owner.set_related(association.name, ids);
        }
        Ok(owner)
    }
}

async fn fetch_related(
    conn: &mut SqliteConnection,
    association: &Association,
    owner: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let sql = format!(
        "SELECT {related} FROM {table} WHERE {owner} = ? ORDER BY {related}",
        related = association.related_column,
        table = association.table,
        owner = association.owner_column,
    );
    sqlx::query_scalar::<_, Uuid>(&sql)
        .bind(owner)
        .fetch_all(&mut *conn)
        .await
}

async fn fetch_related_many(
    conn: &mut SqliteConnection,
    association: &Association,
    owners: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Uuid>>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {owner}, {related} FROM {table} WHERE {owner} IN (",
        owner = association.owner_column,
        related = association.related_column,
        table = association.table,
    ));
    bind_value(
        &mut builder,
        Value::List(owners.iter().copied().map(Value::Uuid).collect()),
    );
    builder.push(format!(
        ") ORDER BY {}, {}",
        association.owner_column, association.related_column
    ));

    let rows = builder
        .build_query_as::<(Uuid, Uuid)>()
        .fetch_all(&mut *conn)
        .await?;
    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (owner, related) in rows {
        grouped.entry(owner).or_default().push(related);
    }
    Ok(grouped)
}

impl<E: Entity> Repository<E> for SqlRepository<E> {
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    async fn save(&self, entity: E) -> RepositoryResult<E> {
        let columns = entity.columns();
        let id = Uuid::new_v4();

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (id, created_at", E::TABLE));
        for (column, _) in &columns {
            builder.push(", ").push(*column);
        }
        builder.push(") VALUES (");
        builder.push_bind(id).push(", ").push_bind(Utc::now());
        for (_, value) in &columns {
            builder.push(", ");
            bind_value(&mut builder, value.clone());
        }
        builder.push(") RETURNING *");

        let result = builder.build_query_as::<E>().fetch_one(&self.pool).await;
        match result {
            Ok(saved) => {
                tracing::debug!(%id, "Entity saved");
                Ok(saved)
            }
            Err(err) => Err(self
                .write_failure(RepositoryOperation::Save, err, &columns, None)
                .await),
        }
    }

    #[tracing::instrument(skip(self, patch), fields(entity = E::NAME))]
    async fn update(&self, id: Uuid, patch: E::Patch) -> RepositoryResult<E> {
        let changes = patch.changes();
        if changes.is_empty() {
            return self
                .get_one(id)
                .await
                .map_err(|e| e.with_operation(RepositoryOperation::Update));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", E::TABLE));
        for (i, (column, value)) in changes.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(*column).push(" = ");
            bind_value(&mut builder, value.clone());
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.storage_failure(RepositoryOperation::Update, e))?;
        let result = builder.build_query_as::<E>().fetch_optional(&mut *tx).await;
        let mut entity = match result {
            Ok(Some(entity)) => entity,
            Ok(None) => return Err(self.not_found(RepositoryOperation::Update, id)),
            Err(err) => {
                // Release the connection before probing unique fields on the pool
                drop(tx);
                return Err(self
                    .write_failure(RepositoryOperation::Update, err, &changes, Some(id))
                    .await
                    .with_entity(E::NAME, id.to_string()));
            }
        };

        self.resolve_preloads(&mut tx, RepositoryOperation::Update, &mut entity)
            .await?;
        tx.commit()
            .await
            .map_err(|e| self.storage_failure(RepositoryOperation::Update, e))?;
        tracing::debug!(fields = changes.len(), "Entity updated");
        Ok(entity)
    }

    #[tracing::instrument(skip(self), fields(entity = E::NAME))]
    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.storage_failure(RepositoryOperation::Delete, e))?;

        if result.rows_affected() == 0 {
            return Err(self.not_found(RepositoryOperation::Delete, id));
        }
        tracing::debug!("Entity deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(entity = E::NAME))]
    async fn get_one(&self, id: Uuid) -> RepositoryResult<E> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.storage_failure(RepositoryOperation::GetOne, e))?;
        self.load(&mut conn, RepositoryOperation::GetOne, id).await
    }

    #[tracing::instrument(skip_all, fields(entity = E::NAME, page = params.page(), per_page = params.per_page()))]
    async fn get_many(&self, params: &Parameters) -> RepositoryResult<(Vec<E>, Meta)> {
        let op = RepositoryOperation::GetMany;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.storage_failure(op, e))?;

        let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
        params.write_predicate(&mut count);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| self.storage_failure(op, e))?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", E::TABLE));
        params.write_predicate(&mut select);
        select.push(" ORDER BY ");
        if let Some((column, direction)) = params.order_by() {
            select
                .push(column)
                .push(" ")
                .push(direction.as_sql())
                .push(", ");
        }
        select
            .push("id ASC LIMIT ")
            .push_bind(i64::from(params.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(params.offset()).unwrap_or(i64::MAX));

        let mut items = select
            .build_query_as::<E>()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| self.storage_failure(op, e))?;
        self.resolve_page_preloads(&mut tx, op, &mut items).await?;

        tx.commit().await.map_err(|e| self.storage_failure(op, e))?;

        let meta = Meta::new(params, u64::try_from(total).unwrap_or_default());
        tracing::debug!(total = meta.total, returned = items.len(), "Page loaded");
        Ok((items, meta))
    }
}

impl<E: Entity> AssociationMutator<E> for SqlRepository<E> {
    #[tracing::instrument(skip(self, related), fields(entity = E::NAME, count = related.len()))]
    async fn attach(&self, id: Uuid, association: &str, related: &[Uuid]) -> RepositoryResult<E> {
        let op = RepositoryOperation::Attach;
        let association = self.association(op, association)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.storage_failure(op, e))?;
        self.ensure_exists(&mut tx, op, id).await?;

        if !related.is_empty() {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} ({}, {}) ",
                association.table, association.owner_column, association.related_column
            ));
            builder.push_values(related, |mut row, related_id| {
                row.push_bind(id).push_bind(*related_id);
            });
            builder.push(" ON CONFLICT DO NOTHING");
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| self.storage_failure(op, e))?;
        }

        let owner = self.reload_owner(&mut tx, op, association, id).await?;
        tx.commit().await.map_err(|e| self.storage_failure(op, e))?;
        tracing::debug!(association = association.name, "Association attached");
        Ok(owner)
    }

    #[tracing::instrument(skip(self, related), fields(entity = E::NAME, count = related.len()))]
    async fn detach(&self, id: Uuid, association: &str, related: &[Uuid]) -> RepositoryResult<E> {
        let op = RepositoryOperation::Detach;
        let association = self.association(op, association)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.storage_failure(op, e))?;
        self.ensure_exists(&mut tx, op, id).await?;

        if !related.is_empty() {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "DELETE FROM {} WHERE {} = ",
                association.table, association.owner_column
            ));
            builder.push_bind(id);
            builder.push(format!(" AND {} IN (", association.related_column));
            bind_value(
                &mut builder,
                Value::List(related.iter().copied().map(Value::Uuid).collect()),
            );
            builder.push(")");
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| self.storage_failure(op, e))?;
        }

        let owner = self.reload_owner(&mut tx, op, association, id).await?;
        tx.commit().await.map_err(|e| self.storage_failure(op, e))?;
        tracing::debug!(association = association.name, "Association detached");
        Ok(owner)
    }

    #[tracing::instrument(skip(self), fields(entity = E::NAME))]
    async fn related_ids(&self, id: Uuid, association: &str) -> RepositoryResult<Vec<Uuid>> {
        let op = RepositoryOperation::GetOne;
        let association = self.association(op, association)?;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.storage_failure(op, e))?;
        self.ensure_exists(&mut conn, op, id).await?;
        fetch_related(&mut conn, association, id)
            .await
            .map_err(|e| self.storage_failure(op, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::entities::{
        Order, OrderPatch, Payment, Repositories, Route, Vehicle, VehiclePatch,
    };
    use crate::repository::{PageLimits, ALREADY_TAKEN, INVALID_ID};

    async fn repositories() -> Repositories {
        Repositories::new(test_pool().await)
    }

    fn page(filters: &[(&str, &str)], page: &str, per_page: &str, sort: &str) -> Parameters {
        Parameters::build(
            filters.iter().copied(),
            page,
            per_page,
            sort,
            Vehicle::filter_spec(),
            PageLimits::default(),
        )
        .unwrap()
    }

    async fn seed_vehicles(repo: &SqlRepository<Vehicle>, count: usize) -> Vec<Vehicle> {
        let mut saved = Vec::new();
        for i in 0..count {
            let capacity = i64::try_from(i).unwrap() + 4;
            saved.push(
                repo.save(Vehicle::new(format!("B {} XY", 1000 + i), "Hiace", capacity))
                    .await
                    .unwrap(),
            );
        }
        saved
    }

    async fn seed_order(repos: &Repositories, reference: &str) -> Order {
        let route = repos
            .routes()
            .save(Route::new("JKT-BDG", "Jakarta", "Bandung", 150.0))
            .await
            .unwrap();
        repos
            .orders()
            .save(Order::new(reference, route.id, "Rina", 2, 300_000))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_get_one_reads_it_back() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        let saved = vehicles
            .save(Vehicle::new("B 1 AA", "Elf", 12))
            .await
            .unwrap();
        assert!(!saved.id.is_nil());

        let loaded = vehicles.get_one(saved.id).await.unwrap();
        assert_eq!(loaded.plate_number, "B 1 AA");
        assert_eq!(loaded.capacity, 12);
    }

    #[tokio::test]
    async fn test_duplicate_unique_field_is_already_taken() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        vehicles.save(Vehicle::new("B 1 AA", "Elf", 12)).await.unwrap();

        let err = vehicles
            .save(Vehicle::new("B 1 AA", "Hiace", 14))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Unprocessable);
        assert_eq!(err.operation, RepositoryOperation::Save);
        assert_eq!(err.fields.len(), 1);
        assert_eq!(err.fields["plate_number"], ALREADY_TAKEN);
    }

    #[tokio::test]
    async fn test_update_nonexistent_is_not_found_on_id() {
        let repos = repositories().await;
        let patch = VehiclePatch {
            capacity: Some(20),
            ..Default::default()
        };
        let err = repos
            .vehicles()
            .update(Uuid::new_v4(), patch)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(err.fields["id"], INVALID_ID);
    }

    #[tokio::test]
    async fn test_update_only_touches_present_fields() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        let saved = vehicles
            .save(Vehicle::new("B 1 AA", "Elf", 12))
            .await
            .unwrap();

        let patch = VehiclePatch {
            model: Some("Elf Long".to_string()),
            ..Default::default()
        };
        let updated = vehicles.update(saved.id, patch).await.unwrap();
        assert_eq!(updated.model, "Elf Long");
        assert_eq!(updated.capacity, 12);
        assert_eq!(updated.plate_number, "B 1 AA");
        assert_eq!(updated.id, saved.id);
    }

    #[tokio::test]
    async fn test_empty_patch_returns_current_or_not_found() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        let saved = vehicles
            .save(Vehicle::new("B 1 AA", "Elf", 12))
            .await
            .unwrap();

        let same = vehicles
            .update(saved.id, VehiclePatch::default())
            .await
            .unwrap();
        assert_eq!(same.model, "Elf");

        let err = vehicles
            .update(Uuid::new_v4(), VehiclePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Update);
    }

    #[tokio::test]
    async fn test_update_collision_is_already_taken() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        vehicles.save(Vehicle::new("B 1 AA", "Elf", 12)).await.unwrap();
        let second = vehicles
            .save(Vehicle::new("B 2 BB", "Elf", 12))
            .await
            .unwrap();

        let patch = VehiclePatch {
            plate_number: Some("B 1 AA".to_string()),
            ..Default::default()
        };
        let err = vehicles.update(second.id, patch).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Unprocessable);
        assert_eq!(err.fields["plate_number"], ALREADY_TAKEN);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        let saved = vehicles
            .save(Vehicle::new("B 1 AA", "Elf", 12))
            .await
            .unwrap();

        vehicles.delete(saved.id).await.unwrap();
        let err = vehicles.delete(saved.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Delete);

        let err = vehicles.get_one(saved.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_many_seven_rows_second_page_of_five() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        seed_vehicles(&vehicles, 7).await;

        let (items, meta) = vehicles.get_many(&page(&[], "2", "5", "")).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            meta,
            Meta {
                page: 2,
                per_page: 5,
                total: 7,
                total_pages: 2
            }
        );
    }

    #[tokio::test]
    async fn test_get_many_page_sizes() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        seed_vehicles(&vehicles, 7).await;

        for (page_no, expected) in [("1", 3), ("2", 3), ("3", 1), ("4", 0)] {
            let (items, meta) = vehicles
                .get_many(&page(&[], page_no, "3", ""))
                .await
                .unwrap();
            assert_eq!(items.len(), expected, "page {}", page_no);
            assert_eq!(meta.total, 7);
            assert_eq!(meta.total_pages, 3);
        }
    }

    #[tokio::test]
    async fn test_get_many_empty_is_success() {
        let repos = repositories().await;
        let (items, meta) = repos.vehicles().get_many(&page(&[], "", "", "")).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(meta.total, 0);
        assert_eq!(meta.total_pages, 0);
        assert_eq!(meta.page, 1);
    }

    #[tokio::test]
    async fn test_get_many_filters_and_sorts() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        seed_vehicles(&vehicles, 7).await;

        let (items, meta) = vehicles
            .get_many(&page(&[("capacity__gte", "8")], "", "", "-capacity"))
            .await
            .unwrap();
        assert_eq!(meta.total, 3);
        let capacities: Vec<i64> = items.iter().map(|v| v.capacity).collect();
        assert_eq!(capacities, vec![10, 9, 8]);

        let (items, _) = vehicles
            .get_many(&page(&[("plate_number__like", "1003")], "", "", ""))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].plate_number, "B 1003 XY");
    }

    #[tokio::test]
    async fn test_get_many_value_is_bound_not_interpolated() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        seed_vehicles(&vehicles, 3).await;

        let (items, meta) = vehicles
            .get_many(&page(&[("model", "x' OR '1'='1")], "", "", ""))
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(meta.total, 0);
    }

    #[tokio::test]
    async fn test_attach_then_detach_restores_related_set() {
        let repos = repositories().await;
        let orders = repos.orders();
        let payments = repos.payments();
        let order = seed_order(&repos, "ORD-1").await;
        let first = payments
            .save(Payment::new("PAY-1", 150_000, "transfer"))
            .await
            .unwrap();
        let second = payments
            .save(Payment::new("PAY-2", 150_000, "cash"))
            .await
            .unwrap();

        let attached = orders.attach(order.id, "payments", &[first.id]).await.unwrap();
        assert_eq!(attached.payment_ids, vec![first.id]);

        let attached = orders.attach(order.id, "payments", &[second.id]).await.unwrap();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(attached.payment_ids, expected);

        let detached = orders.detach(order.id, "payments", &[second.id]).await.unwrap();
        assert_eq!(detached.payment_ids, vec![first.id]);
        assert_eq!(
            orders.related_ids(order.id, "payments").await.unwrap(),
            vec![first.id]
        );
    }

    #[tokio::test]
    async fn test_attach_is_idempotent_and_detach_of_missing_edge_is_noop() {
        let repos = repositories().await;
        let orders = repos.orders();
        let order = seed_order(&repos, "ORD-1").await;
        let payment = repos
            .payments()
            .save(Payment::new("PAY-1", 150_000, "transfer"))
            .await
            .unwrap();

        orders.attach(order.id, "payments", &[payment.id]).await.unwrap();
        let again = orders
            .attach(order.id, "payments", &[payment.id, payment.id])
            .await
            .unwrap();
        assert_eq!(again.payment_ids, vec![payment.id]);

        let detached = orders
            .detach(order.id, "payments", &[Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(detached.payment_ids, vec![payment.id]);
    }

    #[tokio::test]
    async fn test_get_one_preloads_associations() {
        let repos = repositories().await;
        let orders = repos.orders();
        let order = seed_order(&repos, "ORD-1").await;
        let payment = repos
            .payments()
            .save(Payment::new("PAY-1", 150_000, "transfer"))
            .await
            .unwrap();
        orders.attach(order.id, "payments", &[payment.id]).await.unwrap();

        let loaded = orders.get_one(order.id).await.unwrap();
        assert_eq!(loaded.payment_ids, vec![payment.id]);

        let patch = OrderPatch {
            status: Some("paid".to_string()),
            ..Default::default()
        };
        let updated = orders.update(order.id, patch).await.unwrap();
        assert_eq!(updated.status, "paid");
        assert_eq!(updated.payment_ids, vec![payment.id]);
    }

    #[tokio::test]
    async fn test_get_many_preloads_associations_per_item() {
        let repos = repositories().await;
        let orders = repos.orders();
        let payments = repos.payments();
        let paid = seed_order(&repos, "ORD-1").await;
        let unpaid = orders
            .save(Order::new("ORD-2", paid.route_id, "Dewi", 1, 150_000))
            .await
            .unwrap();
        let first = payments
            .save(Payment::new("PAY-1", 150_000, "transfer"))
            .await
            .unwrap();
        let second = payments
            .save(Payment::new("PAY-2", 150_000, "cash"))
            .await
            .unwrap();
        orders
            .attach(paid.id, "payments", &[first.id, second.id])
            .await
            .unwrap();

        let (items, meta) = orders.get_many(&page(&[], "", "", "")).await.unwrap();
        assert_eq!(meta.total, 2);
        let listed_paid = items.iter().find(|o| o.id == paid.id).unwrap();
        let listed_unpaid = items.iter().find(|o| o.id == unpaid.id).unwrap();

        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(listed_paid.payment_ids, expected);
        assert!(listed_unpaid.payment_ids.is_empty());
        assert_eq!(
            listed_paid.payment_ids,
            orders.get_one(paid.id).await.unwrap().payment_ids
        );
    }

    #[tokio::test]
    async fn test_like_matches_wildcard_characters_literally() {
        let repos = repositories().await;
        let vehicles = repos.vehicles();
        for plate in ["B 1 AA", "B_1_AA", "C 9 ZZ"] {
            vehicles.save(Vehicle::new(plate, "Elf", 12)).await.unwrap();
        }

        let (items, meta) = vehicles
            .get_many(&page(&[("plate_number__like", "B_1")], "", "", ""))
            .await
            .unwrap();
        assert_eq!(meta.total, 1);
        assert_eq!(items[0].plate_number, "B_1_AA");

        let (items, meta) = vehicles
            .get_many(&page(&[("plate_number__like", "%")], "", "", ""))
            .await
            .unwrap();
        assert_eq!(meta.total, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_attach_to_missing_owner_is_not_found() {
        let repos = repositories().await;
        let err = repos
            .orders()
            .attach(Uuid::new_v4(), "payments", &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Attach);
        assert_eq!(err.fields["id"], INVALID_ID);
    }

    #[tokio::test]
    async fn test_unknown_association_is_validation_error() {
        let repos = repositories().await;
        let order = seed_order(&repos, "ORD-1").await;
        let err = repos
            .orders()
            .attach(order.id, "drivers", &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Validation);
        assert_eq!(err.fields["association"], "unknown association");
    }

    #[tokio::test]
    async fn test_deleting_owner_removes_edges_but_not_related() {
        let repos = repositories().await;
        let orders = repos.orders();
        let payments = repos.payments();
        let order = seed_order(&repos, "ORD-1").await;
        let payment = payments
            .save(Payment::new("PAY-1", 150_000, "transfer"))
            .await
            .unwrap();
        orders.attach(order.id, "payments", &[payment.id]).await.unwrap();

        orders.delete(order.id).await.unwrap();
        assert!(payments.get_one(payment.id).await.is_ok());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_payments")
            .fetch_one(orders.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
