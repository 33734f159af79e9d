use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{InventoryError, InventoryResult};
use crate::export::{self, ExportFormat, ExportPayload};
use crate::models::{
    BulkUpdateEntry, BulkUpdateReport, CreateProduct, InventoryLog, InventoryStatistics, LogEntry,
    LogFilter, LowStockAlert, NewProduct, Pagination, Product, ProductFieldUpdate, ProductFilter,
    StockLevel, StockMutation, UpdateProduct, DEFAULT_API_SOURCE, DEFAULT_BULK_SOURCE,
};
use crate::repository::InventoryRepository;

/// Tuning knobs for the engine, passed in at construction instead of read
/// from global state.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Default page size for product listings
    pub products_per_page: u64,
    /// Default page size for audit-log listings
    pub logs_per_page: u64,
    /// Hard upper bound on any page size
    pub max_per_page: u64,
    /// Default threshold for the low-stock alert
    pub default_low_stock_threshold: i32,
    /// Newest-rows cap applied to exports
    pub export_limit: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            products_per_page: 50,
            logs_per_page: 10,
            max_per_page: 100,
            default_low_stock_threshold: 10,
            export_limit: 1000,
        }
    }
}

/// Outcome of a product update: either plain field changes, or an audited
/// stock mutation when the payload carried `current_stock`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductUpdateOutcome {
    Fields(Product),
    Stock(StockMutation),
}

/// The inventory engine: validation, error taxonomy, and pagination
/// arithmetic on top of the repository's atomic operations.
pub struct InventoryService<R: InventoryRepository> {
    repository: Arc<R>,
    config: InventoryConfig,
}

impl<R: InventoryRepository> InventoryService<R> {
    pub fn new(repository: R, config: InventoryConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            config,
        }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    fn clamp_page_size(&self, per_page: u64) -> u64 {
        per_page.clamp(1, self.config.max_per_page)
    }

    /// Set a product's stock, appending exactly one audit record.
    ///
    /// A negative target fails validation before any transaction is opened.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        product_id: i32,
        new_stock: i32,
        user_source: Option<String>,
    ) -> InventoryResult<StockMutation> {
        if new_stock < 0 {
            return Err(InventoryError::Validation(
                "Stock cannot be negative".to_string(),
            ));
        }

        let source = user_source.unwrap_or_else(|| DEFAULT_API_SOURCE.to_string());
        self.repository
            .update_stock(product_id, new_stock, &source)
            .await
    }

    /// Apply a batch of stock updates as one all-or-nothing unit.
    ///
    /// Structural validation is a full pre-pass: every entry is checked and
    /// every structural error collected before anything touches storage.
    #[instrument(skip(self, entries), fields(batch_size = entries.len()))]
    pub async fn bulk_update_stock(
        &self,
        entries: &[BulkUpdateEntry],
        user_source: Option<String>,
    ) -> InventoryResult<BulkUpdateReport> {
        let mut errors = Vec::new();
        let mut updates = Vec::with_capacity(entries.len());

        for entry in entries {
            match (entry.product_id, entry.stock) {
                (Some(product_id), Some(stock)) => updates.push(StockLevel { product_id, stock }),
                _ => errors.push("Invalid update data: missing product_id or stock".to_string()),
            }
        }

        if !errors.is_empty() {
            return Err(InventoryError::BulkRejected(errors));
        }

        let source = user_source.unwrap_or_else(|| DEFAULT_BULK_SOURCE.to_string());
        let results = self
            .repository
            .bulk_update_stock(&updates, &source)
            .await?;

        Ok(BulkUpdateReport {
            updated_count: results.len(),
            results,
        })
    }

    /// Create a product, generating a reference when the caller omitted one.
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: CreateProduct) -> InventoryResult<Product> {
        input
            .validate()
            .map_err(|e| InventoryError::Validation(e.to_string()))?;

        let reference = match input.reference {
            Some(reference) => reference,
            None => generate_reference(),
        };

        if self
            .repository
            .find_by_reference(&reference)
            .await?
            .is_some()
        {
            return Err(InventoryError::Conflict(
                "The reference has already been taken".to_string(),
            ));
        }

        self.repository
            .create_product(NewProduct {
                name: input.name,
                reference,
                current_stock: input.current_stock,
            })
            .await
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i32) -> InventoryResult<Product> {
        self.repository
            .get_product(id)
            .await?
            .ok_or(InventoryError::NotFound(id))
    }

    /// Update a product. A `current_stock` field in the payload is routed
    /// through the audited stock path; other fields are written directly.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: i32,
        input: UpdateProduct,
    ) -> InventoryResult<ProductUpdateOutcome> {
        input
            .validate()
            .map_err(|e| InventoryError::Validation(e.to_string()))?;

        if let Some(target) = input.current_stock {
            let mutation = self.update_stock(id, target, input.user_source).await?;
            return Ok(ProductUpdateOutcome::Stock(mutation));
        }

        if let Some(ref reference) = input.reference {
            if let Some(existing) = self.repository.find_by_reference(reference).await? {
                if existing.id != id {
                    return Err(InventoryError::Conflict(
                        "The reference has already been taken".to_string(),
                    ));
                }
            }
        }

        let update = ProductFieldUpdate {
            name: input.name,
            reference: input.reference,
        };
        match self.repository.update_product_fields(id, update).await? {
            Some(product) => Ok(ProductUpdateOutcome::Fields(product)),
            None => Err(InventoryError::NotFound(id)),
        }
    }

    /// Delete a product and its audit records. Returns `false` (not an
    /// error) when the product did not exist.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i32) -> InventoryResult<bool> {
        self.repository.delete_product(id).await
    }

    /// List products with filters and reproducible pagination.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> InventoryResult<(Vec<Product>, Pagination)> {
        let page = page.unwrap_or(1).max(1);
        let per_page = self.clamp_page_size(per_page.unwrap_or(self.config.products_per_page));

        let (products, total) = self.repository.list_products(filter, page, per_page).await?;
        Ok((products, Pagination::new(page, per_page, total)))
    }

    /// Products at or below the threshold (default from config).
    #[instrument(skip(self))]
    pub async fn low_stock(&self, threshold: Option<i32>) -> InventoryResult<LowStockAlert> {
        let threshold = threshold.unwrap_or(self.config.default_low_stock_threshold);
        let products = self.repository.low_stock_products(threshold).await?;
        Ok(LowStockAlert {
            threshold,
            count: products.len(),
            products,
        })
    }

    /// List audit records with filters and reproducible pagination.
    #[instrument(skip(self))]
    pub async fn list_logs(
        &self,
        filter: LogFilter,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> InventoryResult<(Vec<LogEntry>, Pagination)> {
        let page = page.unwrap_or(1).max(1);
        let per_page = self.clamp_page_size(per_page.unwrap_or(self.config.logs_per_page));

        let (entries, total) = self.repository.list_logs(filter, page, per_page).await?;
        Ok((entries, Pagination::new(page, per_page, total)))
    }

    /// Most recent audit records for one product.
    #[instrument(skip(self))]
    pub async fn logs_for_product(
        &self,
        product_id: i32,
        limit: Option<u64>,
    ) -> InventoryResult<Vec<InventoryLog>> {
        let limit = limit.unwrap_or(20).clamp(1, self.config.max_per_page);
        self.repository.logs_for_product(product_id, limit).await
    }

    /// Aggregate statistics over an optional inclusive date range.
    #[instrument(skip(self))]
    pub async fn statistics(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> InventoryResult<InventoryStatistics> {
        self.repository.statistics(date_from, date_to).await
    }

    /// Export the newest matching audit records as CSV or JSON.
    #[instrument(skip(self))]
    pub async fn export_logs(
        &self,
        filter: LogFilter,
        format: ExportFormat,
    ) -> InventoryResult<ExportPayload> {
        let (entries, _total) = self
            .repository
            .list_logs(filter, 1, self.config.export_limit)
            .await?;

        match format {
            ExportFormat::Csv => Ok(ExportPayload::Csv {
                filename: export::csv_filename(chrono::Utc::now()),
                content: export::logs_to_csv(&entries)?,
            }),
            ExportFormat::Json => Ok(ExportPayload::Json(entries)),
        }
    }
}

impl<R: InventoryRepository> Clone for InventoryService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            config: self.config.clone(),
        }
    }
}

/// Generate a reference for products created without one.
fn generate_reference() -> String {
    format!("PRD-{}", chrono::Utc::now().format("%Y%m%d%H%M%S%6f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryInventoryRepository, MockInventoryRepository};
    use chrono::Utc;

    fn product(id: i32, stock: i32) -> Product {
        Product {
            id,
            name: format!("Product {}", id),
            reference: format!("REF-{:03}", id),
            current_stock: stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn mutation(product_id: i32, previous: i32, new: i32, source: &str) -> StockMutation {
        StockMutation {
            product: product(product_id, new),
            log: InventoryLog {
                id: 1,
                product_id,
                previous_stock: previous,
                new_stock: new,
                change_amount: new - previous,
                user_source: source.to_string(),
                created_at: Utc::now(),
            },
            change_amount: new - previous,
        }
    }

    fn service_with_mock(mock: MockInventoryRepository) -> InventoryService<MockInventoryRepository>
    {
        InventoryService::new(mock, InventoryConfig::default())
    }

    async fn seeded_service() -> InventoryService<InMemoryInventoryRepository> {
        let service = InventoryService::new(
            InMemoryInventoryRepository::new(),
            InventoryConfig::default(),
        );
        service
            .create_product(CreateProduct {
                name: "Widget".to_string(),
                reference: Some("WID-001".to_string()),
                current_stock: 100,
            })
            .await
            .unwrap();
        service
            .create_product(CreateProduct {
                name: "Gadget".to_string(),
                reference: Some("GAD-002".to_string()),
                current_stock: 150,
            })
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn test_update_stock_rejects_negative_before_touching_storage() {
        // No expectations set: any repository call would panic.
        let service = service_with_mock(MockInventoryRepository::new());

        let result = service.update_stock(1, -10, None).await;
        let Err(InventoryError::Validation(msg)) = result else {
            panic!("expected Validation error");
        };
        assert_eq!(msg, "Stock cannot be negative");
    }

    #[tokio::test]
    async fn test_update_stock_defaults_source_to_api() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_update_stock()
            .withf(|id, stock, source| *id == 1 && *stock == 150 && source == "api")
            .returning(|id, stock, source| Ok(mutation(id, 100, stock, source)));

        let service = service_with_mock(mock);
        let result = service.update_stock(1, 150, None).await.unwrap();
        assert_eq!(result.change_amount, 50);
        assert_eq!(result.log.user_source, "api");
    }

    #[tokio::test]
    async fn test_update_stock_passes_through_caller_source() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_update_stock()
            .withf(|_, _, source| source == "prestashop")
            .returning(|id, stock, source| Ok(mutation(id, 100, stock, source)));

        let service = service_with_mock(mock);
        let result = service
            .update_stock(1, 150, Some("prestashop".to_string()))
            .await
            .unwrap();
        assert_eq!(result.log.user_source, "prestashop");
    }

    #[tokio::test]
    async fn test_bulk_structural_pre_pass_collects_all_errors() {
        // Two broken entries: both must be reported, storage never touched.
        let service = service_with_mock(MockInventoryRepository::new());

        let entries = [
            BulkUpdateEntry {
                product_id: Some(1),
                stock: Some(100),
            },
            BulkUpdateEntry {
                product_id: None,
                stock: Some(200),
            },
            BulkUpdateEntry {
                product_id: Some(3),
                stock: None,
            },
        ];

        let result = service.bulk_update_stock(&entries, None).await;
        let Err(InventoryError::BulkRejected(errors)) = result else {
            panic!("expected BulkRejected");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e == "Invalid update data: missing product_id or stock"));
    }

    #[tokio::test]
    async fn test_bulk_defaults_source_to_bulk_api() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_bulk_update_stock()
            .withf(|updates, source| updates.len() == 1 && source == "bulk_api")
            .returning(|updates, source| {
                Ok(updates
                    .iter()
                    .map(|u| mutation(u.product_id, 0, u.stock, source))
                    .collect())
            });

        let service = service_with_mock(mock);
        let entries = [BulkUpdateEntry {
            product_id: Some(1),
            stock: Some(100),
        }];
        let report = service.bulk_update_stock(&entries, None).await.unwrap();
        assert_eq!(report.updated_count, 1);
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_reference() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_find_by_reference()
            .returning(|_| Ok(Some(product(1, 10))));

        let service = service_with_mock(mock);
        let result = service
            .create_product(CreateProduct {
                name: "Copy".to_string(),
                reference: Some("REF-001".to_string()),
                current_stock: 0,
            })
            .await;
        assert!(matches!(result, Err(InventoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_product_generates_reference_when_omitted() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_find_by_reference().returning(|_| Ok(None));
        mock.expect_create_product()
            .withf(|input| input.reference.starts_with("PRD-"))
            .returning(|input| {
                Ok(Product {
                    id: 1,
                    name: input.name,
                    reference: input.reference,
                    current_stock: input.current_stock,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            });

        let service = service_with_mock(mock);
        let created = service
            .create_product(CreateProduct {
                name: "Widget".to_string(),
                reference: None,
                current_stock: 5,
            })
            .await
            .unwrap();
        assert!(created.reference.starts_with("PRD-"));
    }

    #[tokio::test]
    async fn test_create_product_validates_input() {
        let service = service_with_mock(MockInventoryRepository::new());
        let result = service
            .create_product(CreateProduct {
                name: String::new(),
                reference: Some("REF-001".to_string()),
                current_stock: 0,
            })
            .await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_product_maps_missing_to_not_found() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_get_product().returning(|_| Ok(None));

        let service = service_with_mock(mock);
        let result = service.get_product(42).await;
        assert!(matches!(result, Err(InventoryError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_update_product_routes_stock_through_audited_path() {
        let service = seeded_service().await;

        let outcome = service
            .update_product(
                1,
                UpdateProduct {
                    current_stock: Some(175),
                    user_source: Some("admin-panel".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ProductUpdateOutcome::Stock(mutation) = outcome else {
            panic!("expected stock outcome");
        };
        assert_eq!(mutation.log.previous_stock, 100);
        assert_eq!(mutation.log.new_stock, 175);
        assert_eq!(mutation.log.user_source, "admin-panel");
    }

    #[tokio::test]
    async fn test_update_product_fields_only() {
        let service = seeded_service().await;

        let outcome = service
            .update_product(
                1,
                UpdateProduct {
                    name: Some("Widget Mk2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ProductUpdateOutcome::Fields(updated) = outcome else {
            panic!("expected fields outcome");
        };
        assert_eq!(updated.name, "Widget Mk2");
        // No audit record for a non-stock update.
        let logs = service.logs_for_product(1, None).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_update_product_unknown_id() {
        let service = seeded_service().await;
        let result = service
            .update_product(
                99,
                UpdateProduct {
                    name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(InventoryError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_low_stock_uses_configured_default_threshold() {
        let mut mock = MockInventoryRepository::new();
        mock.expect_low_stock_products()
            .withf(|threshold| *threshold == 10)
            .returning(|_| Ok(vec![product(1, 3)]));

        let service = service_with_mock(mock);
        let alert = service.low_stock(None).await.unwrap();
        assert_eq!(alert.threshold, 10);
        assert_eq!(alert.count, 1);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped_to_configured_maximum() {
        let service = seeded_service().await;

        let (_, pagination) = service
            .list_logs(LogFilter::default(), None, Some(1000))
            .await
            .unwrap();
        assert_eq!(pagination.per_page, 100);

        let (_, pagination) = service
            .list_logs(LogFilter::default(), None, Some(0))
            .await
            .unwrap();
        assert_eq!(pagination.per_page, 1);
    }

    #[tokio::test]
    async fn test_list_logs_default_page_size_and_totals() {
        let service = seeded_service().await;
        // 2 creation logs exist; add 10 mutations
        for i in 0..10 {
            service
                .update_stock(1, 100 + i, Some("loop".to_string()))
                .await
                .unwrap();
        }

        let (entries, pagination) = service
            .list_logs(LogFilter::default(), None, None)
            .await
            .unwrap();
        assert_eq!(pagination.per_page, 10);
        assert_eq!(pagination.total, 12);
        assert_eq!(pagination.last_page, 2);
        assert_eq!(entries.len(), 10);

        let (entries, pagination) = service
            .list_logs(LogFilter::default(), Some(2), None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(pagination.from, 11);
        assert_eq!(pagination.to, 12);
    }

    #[tokio::test]
    async fn test_export_csv_has_headers_and_rows() {
        let service = seeded_service().await;
        service
            .update_stock(1, 150, Some("test".to_string()))
            .await
            .unwrap();

        let payload = service
            .export_logs(LogFilter::default(), ExportFormat::Csv)
            .await
            .unwrap();

        let ExportPayload::Csv { filename, content } = payload else {
            panic!("expected CSV payload");
        };
        assert!(filename.starts_with("inventory_logs_"));
        assert!(filename.ends_with(".csv"));

        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Product ID,Product Name,Previous Stock,New Stock,Change Amount,User Source,Date"
        );
        // 2 creation logs + 1 mutation
        assert_eq!(lines.count(), 3);
    }

    #[tokio::test]
    async fn test_export_json_returns_entries() {
        let service = seeded_service().await;
        let payload = service
            .export_logs(LogFilter::default(), ExportFormat::Json)
            .await
            .unwrap();
        let ExportPayload::Json(entries) = payload else {
            panic!("expected JSON payload");
        };
        assert_eq!(entries.len(), 2);
    }
}
