use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, Func, IntoColumnRef, SimpleExpr};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, SqlErr, TransactionTrait,
};
use std::time::Duration;

use crate::entity::{inventory_log, product};
use crate::error::{InventoryError, InventoryResult};
use crate::models::{
    InventoryLog, InventoryStatistics, LogEntry, LogFilter, NewProduct, Product,
    ProductFieldUpdate, ProductFilter, StockLevel, StockMutation, CREATION_SOURCE,
};
use crate::repository::InventoryRepository;

/// PostgreSQL implementation of [`InventoryRepository`] using SeaORM.
///
/// Every mutation is an explicit transaction script over a transaction
/// handle: read the product under `SELECT ... FOR UPDATE`, write the stock,
/// append the audit row, commit. The row lock serializes concurrent writers
/// of the same product while leaving other products unblocked.
#[derive(Clone)]
pub struct PgInventoryRepository {
    db: DatabaseConnection,
    statement_timeout: Duration,
}

impl PgInventoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            statement_timeout: Duration::from_secs(5),
        }
    }

    /// Override the per-transaction statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Open a mutation transaction with a bounded statement timeout so a
    /// stalled lock wait fails instead of hanging the caller.
    async fn begin_mutation(&self) -> Result<DatabaseTransaction, DbErr> {
        let txn = self.db.begin().await?;
        txn.execute_unprepared(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .await?;
        Ok(txn)
    }

    async fn rollback(txn: DatabaseTransaction) {
        if let Err(e) = txn.rollback().await {
            tracing::error!("Transaction rollback failed: {}", e);
        }
    }

    /// The per-product mutation script shared by the single and bulk paths.
    /// Returns `None` when the product does not exist (nothing written).
    async fn apply_stock_update(
        txn: &DatabaseTransaction,
        product_id: i32,
        new_stock: i32,
        user_source: &str,
    ) -> Result<Option<StockMutation>, DbErr> {
        let Some(model) = product::Entity::find_by_id(product_id)
            .lock_exclusive()
            .one(txn)
            .await?
        else {
            return Ok(None);
        };

        let previous_stock = model.current_stock;
        let change_amount = new_stock - previous_stock;

        let mut active: product::ActiveModel = model.into();
        active.current_stock = Set(new_stock);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(txn).await?;

        let log = inventory_log::ActiveModel {
            id: NotSet,
            product_id: Set(product_id),
            previous_stock: Set(previous_stock),
            new_stock: Set(new_stock),
            change_amount: Set(change_amount),
            user_source: Set(user_source.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        Ok(Some(StockMutation {
            product: model.into(),
            log: log.into(),
            change_amount,
        }))
    }

    /// Map write-path storage errors, surfacing reference-uniqueness
    /// violations as conflicts.
    fn map_write_err(e: DbErr) -> InventoryError {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                InventoryError::Conflict("The reference has already been taken".to_string())
            }
            _ => InventoryError::Database(e),
        }
    }

    /// Translate a [`LogFilter`] into a filtered select over inventory_logs.
    fn log_query(filter: &LogFilter) -> Select<inventory_log::Entity> {
        let mut query = inventory_log::Entity::find();

        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory_log::Column::ProductId.eq(product_id));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(inventory_log::Column::CreatedAt.gte(day_start(from)));
        }
        if let Some(to) = filter.date_to {
            // Inclusive calendar date: everything strictly before the next day.
            if let Some(next_day) = to.succ_opt() {
                query = query.filter(inventory_log::Column::CreatedAt.lt(day_start(next_day)));
            }
        }
        if let Some(ref term) = filter.user_source {
            query = query.filter(contains_ci(inventory_log::Column::UserSource, term));
        }

        query
    }
}

/// UTC midnight at the start of the given calendar date.
fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Case-insensitive substring match: `LOWER(col) LIKE '%term%'`.
fn contains_ci<C: IntoColumnRef>(col: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", term.to_lowercase()))
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn create_product(&self, input: NewProduct) -> InventoryResult<Product> {
        let initial_stock = input.current_stock;
        let txn = self.db.begin().await?;

        let active: product::ActiveModel = input.into();
        let result: Result<product::Model, DbErr> = async {
            let model = active.insert(&txn).await?;
            if initial_stock > 0 {
                inventory_log::ActiveModel {
                    id: NotSet,
                    product_id: Set(model.id),
                    previous_stock: Set(0),
                    new_stock: Set(initial_stock),
                    change_amount: Set(initial_stock),
                    user_source: Set(CREATION_SOURCE.to_string()),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&txn)
                .await?;
            }
            Ok(model)
        }
        .await;

        match result {
            Ok(model) => {
                txn.commit().await?;
                tracing::info!(product_id = model.id, "Created product");
                Ok(model.into())
            }
            Err(e) => {
                Self::rollback(txn).await;
                Err(Self::map_write_err(e))
            }
        }
    }

    async fn get_product(&self, id: i32) -> InventoryResult<Option<Product>> {
        let model = product::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_reference(&self, reference: &str) -> InventoryResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Reference.eq(reference))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update_product_fields(
        &self,
        id: i32,
        update: ProductFieldUpdate,
    ) -> InventoryResult<Option<Product>> {
        let Some(model) = product::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: product::ActiveModel = model.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(reference) = update.reference {
            active.reference = Set(reference);
        }
        active.updated_at = Set(Utc::now().into());

        let model = active.update(&self.db).await.map_err(Self::map_write_err)?;
        tracing::info!(product_id = id, "Updated product fields");
        Ok(Some(model.into()))
    }

    async fn delete_product(&self, id: i32) -> InventoryResult<bool> {
        let txn = self.db.begin().await?;

        let result: Result<bool, DbErr> = async {
            inventory_log::Entity::delete_many()
                .filter(inventory_log::Column::ProductId.eq(id))
                .exec(&txn)
                .await?;
            let res = product::Entity::delete_by_id(id).exec(&txn).await?;
            Ok(res.rows_affected > 0)
        }
        .await;

        match result {
            Ok(deleted) => {
                txn.commit().await?;
                if deleted {
                    tracing::info!(product_id = id, "Deleted product and its audit records");
                }
                Ok(deleted)
            }
            Err(e) => {
                Self::rollback(txn).await;
                Err(InventoryError::Database(e))
            }
        }
    }

    async fn update_stock(
        &self,
        product_id: i32,
        new_stock: i32,
        user_source: &str,
    ) -> InventoryResult<StockMutation> {
        let txn = self
            .begin_mutation()
            .await
            .map_err(InventoryError::MutationFailed)?;

        match Self::apply_stock_update(&txn, product_id, new_stock, user_source).await {
            Ok(Some(mutation)) => {
                txn.commit().await.map_err(InventoryError::MutationFailed)?;
                tracing::info!(
                    product_id,
                    previous_stock = mutation.log.previous_stock,
                    new_stock,
                    change_amount = mutation.change_amount,
                    "Updated stock"
                );
                Ok(mutation)
            }
            Ok(None) => {
                Self::rollback(txn).await;
                Err(InventoryError::NotFound(product_id))
            }
            Err(e) => {
                Self::rollback(txn).await;
                Err(InventoryError::MutationFailed(e))
            }
        }
    }

    async fn bulk_update_stock(
        &self,
        updates: &[StockLevel],
        user_source: &str,
    ) -> InventoryResult<Vec<StockMutation>> {
        let txn = self
            .begin_mutation()
            .await
            .map_err(InventoryError::MutationFailed)?;

        let mut results = Vec::with_capacity(updates.len());
        let mut errors = Vec::new();

        for update in updates {
            if update.stock < 0 {
                errors.push(format!(
                    "Product {}: Stock cannot be negative",
                    update.product_id
                ));
                continue;
            }
            match Self::apply_stock_update(&txn, update.product_id, update.stock, user_source)
                .await
            {
                Ok(Some(mutation)) => results.push(mutation),
                Ok(None) => errors.push(format!(
                    "Product {}: {}",
                    update.product_id,
                    InventoryError::NotFound(update.product_id)
                )),
                // A storage error poisons the transaction; nothing later in
                // the batch can proceed, so abort immediately.
                Err(e) => {
                    Self::rollback(txn).await;
                    return Err(InventoryError::MutationFailed(e));
                }
            }
        }

        if !errors.is_empty() {
            Self::rollback(txn).await;
            return Err(InventoryError::BulkRejected(errors));
        }

        txn.commit().await.map_err(InventoryError::MutationFailed)?;
        tracing::info!(count = results.len(), "Bulk stock update committed");
        Ok(results)
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<Product>, u64)> {
        let mut query = product::Entity::find();

        if let Some(ref term) = filter.search {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(product::Column::Name, term))
                    .add(contains_ci(product::Column::Reference, term)),
            );
        }
        if let Some(ref term) = filter.name {
            query = query.filter(contains_ci(product::Column::Name, term));
        }
        if let Some(ref term) = filter.reference {
            query = query.filter(contains_ci(product::Column::Reference, term));
        }
        if let Some(min) = filter.min_stock {
            query = query.filter(product::Column::CurrentStock.gte(min));
        }
        if let Some(max) = filter.max_stock {
            query = query.filter(product::Column::CurrentStock.lte(max));
        }

        let total = query.clone().count(&self.db).await?;
        let models = query
            .order_by_desc(product::Column::Id)
            .offset((page - 1) * per_page)
            .limit(per_page)
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn low_stock_products(&self, threshold: i32) -> InventoryResult<Vec<Product>> {
        let models = product::Entity::find()
            .filter(product::Column::CurrentStock.lte(threshold))
            .order_by_asc(product::Column::CurrentStock)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_logs(
        &self,
        filter: LogFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<LogEntry>, u64)> {
        let query = Self::log_query(&filter);

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .find_also_related(product::Entity)
            .order_by_desc(inventory_log::Column::CreatedAt)
            .order_by_desc(inventory_log::Column::Id)
            .offset((page - 1) * per_page)
            .limit(per_page)
            .all(&self.db)
            .await?;

        let entries = rows
            .into_iter()
            .map(|(log_model, product_model)| {
                let log: InventoryLog = log_model.into();
                let product = product_model
                    .as_ref()
                    .map(|p| (p.name.as_str(), p.reference.as_str()));
                LogEntry::from_parts(&log, product)
            })
            .collect();

        Ok((entries, total))
    }

    async fn logs_for_product(
        &self,
        product_id: i32,
        limit: u64,
    ) -> InventoryResult<Vec<InventoryLog>> {
        let models = inventory_log::Entity::find()
            .filter(inventory_log::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_log::Column::CreatedAt)
            .order_by_desc(inventory_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn statistics(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> InventoryResult<InventoryStatistics> {
        let range = LogFilter {
            date_from,
            date_to,
            ..Default::default()
        };
        let base = Self::log_query(&range);

        let total_logs = base.clone().count(&self.db).await?;

        let increases: i64 = base
            .clone()
            .select_only()
            .column_as(inventory_log::Column::ChangeAmount.sum(), "total")
            .filter(inventory_log::Column::ChangeAmount.gt(0))
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0);

        let decreases: i64 = base
            .select_only()
            .column_as(inventory_log::Column::ChangeAmount.sum(), "total")
            .filter(inventory_log::Column::ChangeAmount.lt(0))
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0);

        let total_stock_decreases = decreases.abs();
        Ok(InventoryStatistics {
            total_logs,
            total_stock_increases: increases,
            total_stock_decreases,
            net_change: increases - total_stock_decreases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::QueryTrait;

    #[test]
    fn test_day_start_is_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let start = day_start(date);
        assert_eq!(start.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_log_query_builds_inclusive_range_sql() {
        let filter = LogFilter {
            product_id: Some(7),
            date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
            user_source: Some("API".to_string()),
        };
        let sql = PgInventoryRepository::log_query(&filter)
            .build(sea_orm::DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains("\"product_id\" = 7"));
        // Upper bound is exclusive midnight of the following day.
        assert!(sql.contains("2024-04-01"));
        assert!(sql.contains("LOWER"));
        assert!(sql.contains("%api%"));
    }
}
