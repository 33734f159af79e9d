use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{InventoryError, InventoryResult};
use crate::models::{
    InventoryLog, InventoryStatistics, LogEntry, LogFilter, NewProduct, Product,
    ProductFieldUpdate, ProductFilter, StockLevel, StockMutation,
};

/// Repository trait for the product and audit-log stores.
///
/// Each write operation is one atomic unit: implementations must guarantee
/// that the product update and its audit record commit together or not at
/// all, and that a bulk batch is all-or-nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Create a product; when `current_stock > 0` also append the
    /// creation-sourced audit record in the same unit.
    async fn create_product(&self, input: NewProduct) -> InventoryResult<Product>;

    /// Get a product by ID
    async fn get_product(&self, id: i32) -> InventoryResult<Option<Product>>;

    /// Find a product by its unique reference
    async fn find_by_reference(&self, reference: &str) -> InventoryResult<Option<Product>>;

    /// Update non-stock fields; returns `None` when the product is absent.
    async fn update_product_fields(
        &self,
        id: i32,
        update: ProductFieldUpdate,
    ) -> InventoryResult<Option<Product>>;

    /// Delete a product and all its audit records. Returns `false` when the
    /// product did not exist.
    async fn delete_product(&self, id: i32) -> InventoryResult<bool>;

    /// Set a product's stock to `new_stock`, appending exactly one audit
    /// record with the recomputed delta.
    async fn update_stock(
        &self,
        product_id: i32,
        new_stock: i32,
        user_source: &str,
    ) -> InventoryResult<StockMutation>;

    /// Apply a batch of stock updates as a single all-or-nothing unit.
    /// Failure reports the collected per-entry errors via
    /// [`InventoryError::BulkRejected`] with nothing committed.
    async fn bulk_update_stock(
        &self,
        updates: &[StockLevel],
        user_source: &str,
    ) -> InventoryResult<Vec<StockMutation>>;

    /// List products matching the filter, newest first; returns the page
    /// plus the total match count.
    async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<Product>, u64)>;

    /// Products with `current_stock <= threshold`
    async fn low_stock_products(&self, threshold: i32) -> InventoryResult<Vec<Product>>;

    /// List audit records joined with product display fields, ordered by
    /// `created_at` descending (ties broken by descending id); returns the
    /// page plus the total match count.
    async fn list_logs(
        &self,
        filter: LogFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<LogEntry>, u64)>;

    /// Most recent audit records for one product, capped at `limit`.
    async fn logs_for_product(
        &self,
        product_id: i32,
        limit: u64,
    ) -> InventoryResult<Vec<InventoryLog>>;

    /// Aggregate statistics over the (optional, inclusive) date range.
    async fn statistics(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> InventoryResult<InventoryStatistics>;
}

#[derive(Debug)]
struct InMemoryState {
    products: BTreeMap<i32, Product>,
    logs: Vec<InventoryLog>,
    next_product_id: i32,
    next_log_id: i64,
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            logs: Vec::new(),
            next_product_id: 1,
            next_log_id: 1,
        }
    }
}

impl InMemoryState {
    /// The shared mutation script: returns `None` when the product is
    /// missing, otherwise writes the stock and appends one log.
    fn apply_stock_update(
        &mut self,
        product_id: i32,
        new_stock: i32,
        user_source: &str,
    ) -> Option<StockMutation> {
        let product = self.products.get_mut(&product_id)?;
        let previous_stock = product.current_stock;
        let change_amount = new_stock - previous_stock;

        product.current_stock = new_stock;
        product.updated_at = Utc::now();
        let product = product.clone();

        let log = InventoryLog {
            id: self.next_log_id,
            product_id,
            previous_stock,
            new_stock,
            change_amount,
            user_source: user_source.to_string(),
            created_at: Utc::now(),
        };
        self.next_log_id += 1;
        self.logs.push(log.clone());

        Some(StockMutation {
            product,
            log,
            change_amount,
        })
    }

    fn sorted_logs_desc(&self, filter: &LogFilter) -> Vec<InventoryLog> {
        let mut logs: Vec<InventoryLog> = self
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        logs
    }
}

/// In-memory implementation of [`InventoryRepository`] (for development and
/// testing). Reproduces the Postgres implementation's atomicity contract:
/// bulk updates stage into a scratch copy and swap in only on success.
#[derive(Debug, Default, Clone)]
pub struct InMemoryInventoryRepository {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn create_product(&self, input: NewProduct) -> InventoryResult<Product> {
        let mut state = self.state.write().await;

        let reference_taken = state
            .products
            .values()
            .any(|p| p.reference == input.reference);
        if reference_taken {
            return Err(InventoryError::Conflict(
                "The reference has already been taken".to_string(),
            ));
        }

        let now = Utc::now();
        let product = Product {
            id: state.next_product_id,
            name: input.name,
            reference: input.reference,
            current_stock: input.current_stock,
            created_at: now,
            updated_at: now,
        };
        state.next_product_id += 1;
        state.products.insert(product.id, product.clone());

        if input.current_stock > 0 {
            let log = InventoryLog {
                id: state.next_log_id,
                product_id: product.id,
                previous_stock: 0,
                new_stock: input.current_stock,
                change_amount: input.current_stock,
                user_source: crate::models::CREATION_SOURCE.to_string(),
                created_at: now,
            };
            state.next_log_id += 1;
            state.logs.push(log);
        }

        tracing::info!(product_id = product.id, "Created product");
        Ok(product)
    }

    async fn get_product(&self, id: i32) -> InventoryResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> InventoryResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .find(|p| p.reference == reference)
            .cloned())
    }

    async fn update_product_fields(
        &self,
        id: i32,
        update: ProductFieldUpdate,
    ) -> InventoryResult<Option<Product>> {
        let mut state = self.state.write().await;

        if let Some(ref reference) = update.reference {
            let taken = state
                .products
                .values()
                .any(|p| p.id != id && &p.reference == reference);
            if taken {
                return Err(InventoryError::Conflict(
                    "The reference has already been taken".to_string(),
                ));
            }
        }

        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(reference) = update.reference {
            product.reference = reference;
        }
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i32) -> InventoryResult<bool> {
        let mut state = self.state.write().await;

        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        state.logs.retain(|log| log.product_id != id);

        tracing::info!(product_id = id, "Deleted product and its audit records");
        Ok(true)
    }

    async fn update_stock(
        &self,
        product_id: i32,
        new_stock: i32,
        user_source: &str,
    ) -> InventoryResult<StockMutation> {
        let mut state = self.state.write().await;
        state
            .apply_stock_update(product_id, new_stock, user_source)
            .ok_or(InventoryError::NotFound(product_id))
    }

    async fn bulk_update_stock(
        &self,
        updates: &[StockLevel],
        user_source: &str,
    ) -> InventoryResult<Vec<StockMutation>> {
        let mut state = self.state.write().await;

        // Stage the whole batch; the live state is only replaced when every
        // entry applied cleanly.
        let mut staged = InMemoryState {
            products: state.products.clone(),
            logs: state.logs.clone(),
            next_product_id: state.next_product_id,
            next_log_id: state.next_log_id,
        };

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
            match staged.apply_stock_update(update.product_id, update.stock, user_source) {
                Some(mutation) => results.push(mutation),
                None => errors.push(format!(
                    "Product {}: {}",
                    update.product_id,
                    InventoryError::NotFound(update.product_id)
                )),
            }
        }

        if !errors.is_empty() {
            return Err(InventoryError::BulkRejected(errors));
        }

        *state = staged;
        Ok(results)
    }

    async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<Product>, u64)> {
        let state = self.state.read().await;

        let matches_ci = |value: &str, term: &Option<String>| match term {
            Some(term) => value.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        };

        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| {
                if let Some(ref term) = filter.search {
                    let term = term.to_lowercase();
                    if !p.name.to_lowercase().contains(&term)
                        && !p.reference.to_lowercase().contains(&term)
                    {
                        return false;
                    }
                }
                if !matches_ci(&p.name, &filter.name) {
                    return false;
                }
                if !matches_ci(&p.reference, &filter.reference) {
                    return false;
                }
                if let Some(min) = filter.min_stock {
                    if p.current_stock < min {
                        return false;
                    }
                }
                if let Some(max) = filter.max_stock {
                    if p.current_stock > max {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        // Newest first
        products.sort_by(|a, b| b.id.cmp(&a.id));

        let total = products.len() as u64;
        let page_items = products
            .into_iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .collect();

        Ok((page_items, total))
    }

    async fn low_stock_products(&self, threshold: i32) -> InventoryResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.current_stock <= threshold)
            .cloned()
            .collect())
    }

    async fn list_logs(
        &self,
        filter: LogFilter,
        page: u64,
        per_page: u64,
    ) -> InventoryResult<(Vec<LogEntry>, u64)> {
        let state = self.state.read().await;

        let logs = state.sorted_logs_desc(&filter);
        let total = logs.len() as u64;

        let entries = logs
            .iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .map(|log| {
                let product = state
                    .products
                    .get(&log.product_id)
                    .map(|p| (p.name.as_str(), p.reference.as_str()));
                LogEntry::from_parts(log, product)
            })
            .collect();

        Ok((entries, total))
    }

    async fn logs_for_product(
        &self,
        product_id: i32,
        limit: u64,
    ) -> InventoryResult<Vec<InventoryLog>> {
        let state = self.state.read().await;
        let filter = LogFilter {
            product_id: Some(product_id),
            ..Default::default()
        };
        Ok(state
            .sorted_logs_desc(&filter)
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn statistics(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> InventoryResult<InventoryStatistics> {
        let state = self.state.read().await;
        let filter = LogFilter {
            date_from,
            date_to,
            ..Default::default()
        };

        let mut total_logs = 0u64;
        let mut increases = 0i64;
        let mut decreases = 0i64;

        for log in state.logs.iter().filter(|log| filter.matches(log)) {
            total_logs += 1;
            if log.change_amount > 0 {
                increases += log.change_amount as i64;
            } else {
                decreases += log.change_amount as i64;
            }
        }

        Ok(InventoryStatistics {
            total_logs,
            total_stock_increases: increases,
            total_stock_decreases: decreases.abs(),
            net_change: increases - decreases.abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_repo() -> InMemoryInventoryRepository {
        let repo = InMemoryInventoryRepository::new();
        repo.create_product(NewProduct {
            name: "Widget".to_string(),
            reference: "WID-001".to_string(),
            current_stock: 100,
        })
        .await
        .unwrap();
        repo.create_product(NewProduct {
            name: "Gadget".to_string(),
            reference: "GAD-002".to_string(),
            current_stock: 150,
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_create_with_initial_stock_writes_creation_log() {
        let repo = InMemoryInventoryRepository::new();
        let product = repo
            .create_product(NewProduct {
                name: "Widget".to_string(),
                reference: "WID-001".to_string(),
                current_stock: 25,
            })
            .await
            .unwrap();

        let logs = repo.logs_for_product(product.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].previous_stock, 0);
        assert_eq!(logs[0].new_stock, 25);
        assert_eq!(logs[0].change_amount, 25);
        assert_eq!(logs[0].user_source, "creation");
    }

    #[tokio::test]
    async fn test_create_with_zero_stock_writes_no_log() {
        let repo = InMemoryInventoryRepository::new();
        let product = repo
            .create_product(NewProduct {
                name: "Widget".to_string(),
                reference: "WID-001".to_string(),
                current_stock: 0,
            })
            .await
            .unwrap();

        let logs = repo.logs_for_product(product.id, 10).await.unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_reference_conflicts() {
        let repo = seeded_repo().await;
        let result = repo
            .create_product(NewProduct {
                name: "Copy".to_string(),
                reference: "WID-001".to_string(),
                current_stock: 0,
            })
            .await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_stock_pairs_product_and_log() {
        let repo = seeded_repo().await;

        let mutation = repo.update_stock(1, 150, "test").await.unwrap();
        assert_eq!(mutation.log.previous_stock, 100);
        assert_eq!(mutation.log.new_stock, 150);
        assert_eq!(mutation.change_amount, 50);
        assert_eq!(mutation.product.current_stock, 150);

        let product = repo.get_product(1).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 150);

        // creation log + this mutation
        let logs = repo.logs_for_product(1, 10).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn test_update_stock_to_zero_records_negative_delta() {
        let repo = seeded_repo().await;
        let mutation = repo.update_stock(1, 0, "test").await.unwrap();
        assert_eq!(mutation.change_amount, -100);
        assert_eq!(mutation.log.new_stock, 0);
    }

    #[tokio::test]
    async fn test_update_stock_unknown_product_leaves_no_trace() {
        let repo = seeded_repo().await;
        let result = repo.update_stock(99, 50, "test").await;
        assert!(matches!(result, Err(InventoryError::NotFound(99))));

        let (_, total) = repo
            .list_logs(LogFilter::default(), 1, 100)
            .await
            .unwrap();
        // Only the two creation logs
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_current_stock_always_equals_latest_log() {
        let repo = seeded_repo().await;
        for target in [120, 80, 0, 42] {
            repo.update_stock(1, target, "loop").await.unwrap();
            let product = repo.get_product(1).await.unwrap().unwrap();
            let logs = repo.logs_for_product(1, 1).await.unwrap();
            assert_eq!(product.current_stock, logs[0].new_stock);
            assert_eq!(logs[0].change_amount, logs[0].new_stock - logs[0].previous_stock);
        }
    }

    #[tokio::test]
    async fn test_bulk_update_applies_all_entries() {
        let repo = seeded_repo().await;
        let updates = [
            StockLevel {
                product_id: 1,
                stock: 200,
            },
            StockLevel {
                product_id: 2,
                stock: 300,
            },
        ];

        let results = repo.bulk_update_stock(&updates, "bulk").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].change_amount, 100);
        assert_eq!(results[1].change_amount, 150);

        assert_eq!(repo.get_product(1).await.unwrap().unwrap().current_stock, 200);
        assert_eq!(repo.get_product(2).await.unwrap().unwrap().current_stock, 300);
    }

    #[tokio::test]
    async fn test_bulk_update_is_all_or_nothing() {
        let repo = seeded_repo().await;
        let updates = [
            StockLevel {
                product_id: 1,
                stock: 200,
            },
            StockLevel {
                product_id: 99,
                stock: 300,
            },
        ];

        let result = repo.bulk_update_stock(&updates, "bulk").await;
        let Err(InventoryError::BulkRejected(errors)) = result else {
            panic!("expected BulkRejected");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Product 99"));

        // Product 1 untouched, no new logs
        assert_eq!(repo.get_product(1).await.unwrap().unwrap().current_stock, 100);
        let (_, total) = repo
            .list_logs(LogFilter::default(), 1, 100)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_bulk_update_rejects_negative_stock_entry() {
        let repo = seeded_repo().await;
        let updates = [
            StockLevel {
                product_id: 1,
                stock: -5,
            },
            StockLevel {
                product_id: 2,
                stock: 300,
            },
        ];

        let result = repo.bulk_update_stock(&updates, "bulk").await;
        let Err(InventoryError::BulkRejected(errors)) = result else {
            panic!("expected BulkRejected");
        };
        assert!(errors[0].contains("Stock cannot be negative"));
        // The valid entry must not have been committed either.
        assert_eq!(repo.get_product(2).await.unwrap().unwrap().current_stock, 150);
    }

    #[tokio::test]
    async fn test_delete_product_cascades_logs() {
        let repo = seeded_repo().await;
        repo.update_stock(1, 120, "test").await.unwrap();

        assert!(repo.delete_product(1).await.unwrap());
        assert!(repo.get_product(1).await.unwrap().is_none());

        let (_, total) = repo
            .list_logs(LogFilter::default(), 1, 100)
            .await
            .unwrap();
        // Only product 2's creation log remains
        assert_eq!(total, 1);

        assert!(!repo.delete_product(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_logs_newest_first() {
        let repo = seeded_repo().await;
        repo.update_stock(1, 120, "a").await.unwrap();
        repo.update_stock(1, 90, "b").await.unwrap();

        let (entries, total) = repo
            .list_logs(LogFilter::default(), 1, 100)
            .await
            .unwrap();
        assert_eq!(total, 4);
        for pair in entries.windows(2) {
            assert!(pair[0].id > pair[1].id || pair[0].created_at >= pair[1].created_at);
        }
        assert_eq!(entries[0].user_source, "b");
        assert_eq!(entries[0].product_name, "Widget");
    }

    #[tokio::test]
    async fn test_list_logs_filters_by_source() {
        let repo = seeded_repo().await;
        repo.update_stock(1, 120, "WooCommerce").await.unwrap();

        let filter = LogFilter {
            user_source: Some("woo".to_string()),
            ..Default::default()
        };
        let (entries, total) = repo.list_logs(filter, 1, 100).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].user_source, "WooCommerce");
    }

    #[tokio::test]
    async fn test_statistics_split_increases_and_decreases() {
        let repo = seeded_repo().await;
        repo.update_stock(1, 150, "t").await.unwrap(); // +50
        repo.update_stock(1, 100, "t").await.unwrap(); // -50
        repo.update_stock(2, 100, "t").await.unwrap(); // -50

        let stats = repo.statistics(None, None).await.unwrap();
        // creation logs: +100, +150
        assert_eq!(stats.total_logs, 5);
        assert_eq!(stats.total_stock_increases, 300);
        assert_eq!(stats.total_stock_decreases, 100);
        assert_eq!(stats.net_change, 200);
    }

    #[tokio::test]
    async fn test_statistics_are_idempotent() {
        let repo = seeded_repo().await;
        repo.update_stock(1, 150, "t").await.unwrap();

        let first = repo.statistics(None, None).await.unwrap();
        let second = repo.statistics(None, None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_products_search_and_bounds() {
        let repo = seeded_repo().await;

        let (items, total) = repo
            .list_products(
                ProductFilter {
                    search: Some("wid".to_string()),
                    ..Default::default()
                },
                1,
                50,
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Widget");

        let (items, total) = repo
            .list_products(
                ProductFilter {
                    min_stock: Some(120),
                    ..Default::default()
                },
                1,
                50,
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Gadget");
    }

    #[tokio::test]
    async fn test_list_products_newest_first() {
        let repo = seeded_repo().await;
        let (items, _) = repo
            .list_products(ProductFilter::default(), 1, 50)
            .await
            .unwrap();
        assert_eq!(items[0].id, 2);
        assert_eq!(items[1].id, 1);
    }

    #[tokio::test]
    async fn test_low_stock_threshold_is_inclusive() {
        let repo = seeded_repo().await;
        let products = repo.low_stock_products(100).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, 1);
    }

    #[tokio::test]
    async fn test_update_product_fields_checks_reference_uniqueness() {
        let repo = seeded_repo().await;
        let result = repo
            .update_product_fields(
                1,
                ProductFieldUpdate {
                    reference: Some("GAD-002".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));

        let updated = repo
            .update_product_fields(
                1,
                ProductFieldUpdate {
                    name: Some("Widget Mk2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Widget Mk2");

        let missing = repo
            .update_product_fields(99, ProductFieldUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
