mod logs;
mod products;
pub mod responses;

use axum::{
    routing::{get, patch, post},
    Router,
};
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{InventoryError, InventoryResult};
use crate::models::{
    BulkStockUpdateRequest, BulkUpdateReport, CreateProduct, InventoryLog, InventoryStatistics,
    LogEntry, LowStockAlert, Pagination, Product, StockMutation, StockUpdateRequest, UpdateProduct,
};
use crate::repository::InventoryRepository;
use crate::service::InventoryService;

/// OpenAPI documentation for the inventory API
#[derive(OpenApi)]
#[openapi(
    paths(
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::update_stock,
        products::bulk_update_stock,
        products::low_stock,
        products::product_logs,
        logs::list_logs,
        logs::statistics,
        logs::export_logs,
    ),
    components(schemas(
        Product,
        InventoryLog,
        CreateProduct,
        UpdateProduct,
        StockUpdateRequest,
        BulkStockUpdateRequest,
        StockMutation,
        BulkUpdateReport,
        InventoryStatistics,
        LowStockAlert,
        LogEntry,
        Pagination,
        responses::StockUpdateData,
    )),
    tags(
        (name = "products", description = "Product management and stock mutations"),
        (name = "inventory-logs", description = "Audit trail queries, statistics, and export")
    )
)]
pub struct ApiDoc;

/// Router for `/products`
pub fn products_router<R: InventoryRepository + 'static>(
    service: InventoryService<R>,
) -> Router {
    let shared = Arc::new(service);

    Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route("/low-stock", get(products::low_stock))
        .route("/bulk-update-stock", post(products::bulk_update_stock))
        .route(
            "/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/{id}/stock", patch(products::update_stock))
        .route("/{id}/logs", get(products::product_logs))
        .with_state(shared)
}

/// Router for `/inventory-logs`
pub fn logs_router<R: InventoryRepository + 'static>(service: InventoryService<R>) -> Router {
    let shared = Arc::new(service);

    Router::new()
        .route("/", get(logs::list_logs))
        .route("/statistics", get(logs::statistics))
        .route("/export", get(logs::export_logs))
        .with_state(shared)
}

/// Parse an optional numeric query parameter, surfacing a 422 on garbage.
fn parse_param<T: FromStr>(raw: Option<&str>, field: &str) -> InventoryResult<Option<T>> {
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|_| InventoryError::Validation(format!("The {} must be an integer", field)))
    })
    .transpose()
}

/// Parse an optional `YYYY-MM-DD` query parameter, surfacing a 422 on garbage.
fn parse_date(raw: Option<&str>, field: &str) -> InventoryResult<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| InventoryError::Validation(format!("The {} is not a valid date", field)))
    })
    .transpose()
}
