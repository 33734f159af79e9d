use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_helpers::{ApiResponse, ValidatedJson};
use std::sync::Arc;

use super::responses::{
    BulkUpdateResponse, ProductListResponse, ProductLogEntry, ProductLogsResponse,
    StockUpdateData, StockUpdateResponse,
};
use super::{parse_param, InventoryResult};
use crate::models::{
    BulkStockUpdateRequest, BulkUpdateReport, CreateProduct, ListProductsQuery, LowStockAlert,
    LowStockQuery, Product, ProductFilter, ProductLogsQuery, StockUpdateRequest, UpdateProduct,
};
use crate::repository::InventoryRepository;
use crate::service::{InventoryService, ProductUpdateOutcome};

/// List products with filters and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Paginated product list", body = ProductListResponse),
        (status = 422, description = "Malformed filters"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_products<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Query(query): Query<ListProductsQuery>,
) -> InventoryResult<Response> {
    let filter = ProductFilter {
        search: query.search,
        name: query.name,
        reference: query.reference,
        min_stock: parse_param(query.min_stock.as_deref(), "min_stock")?,
        max_stock: parse_param(query.max_stock.as_deref(), "max_stock")?,
    };
    let page = parse_param(query.page.as_deref(), "page")?;
    let per_page = parse_param(query.per_page.as_deref(), "per_page")?;

    let (products, pagination) = service.list_products(filter, page, per_page).await?;
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        data: products,
        pagination,
    })
    .into_response())
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_product<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Path(id): Path<i32>,
) -> InventoryResult<Response> {
    let product = service.get_product(id).await?;
    Ok(Json(ApiResponse::new(product)).into_response())
}

/// Create a product; a nonzero initial stock also writes a creation log
#[utoipa::path(
    post,
    path = "",
    tag = "products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 409, description = "Duplicate reference"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_product<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> InventoryResult<Response> {
    let product = service.create_product(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            product,
            "Product created successfully",
        )),
    )
        .into_response())
}

/// Update product fields; a `current_stock` field is routed through the
/// audited stock-mutation path
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Duplicate reference"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_product<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> InventoryResult<Response> {
    match service.update_product(id, input).await? {
        ProductUpdateOutcome::Fields(product) => Ok(Json(ApiResponse::with_message(
            product,
            "Product updated successfully",
        ))
        .into_response()),
        ProductUpdateOutcome::Stock(mutation) => Ok(Json(StockUpdateResponse {
            success: true,
            message: "Stock updated successfully".to_string(),
            data: StockUpdateData::from(&mutation),
        })
        .into_response()),
    }
}

/// Delete a product and all its audit records
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_product<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Path(id): Path<i32>,
) -> InventoryResult<Response> {
    if !service.delete_product(id).await? {
        return Err(crate::error::InventoryError::NotFound(id));
    }
    Ok(Json(ApiResponse::with_message(
        serde_json::Value::Null,
        "Product deleted successfully",
    ))
    .into_response())
}

/// Set a product's stock level (legacy single-product endpoint)
#[utoipa::path(
    patch,
    path = "/{id}/stock",
    tag = "products",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = StockUpdateRequest,
    responses(
        (status = 200, description = "Stock updated", body = StockUpdateData),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Negative stock"),
        (status = 500, description = "Mutation failed")
    )
)]
pub async fn update_stock<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Path(id): Path<i32>,
    ValidatedJson(input): ValidatedJson<StockUpdateRequest>,
) -> InventoryResult<Response> {
    let mutation = service
        .update_stock(id, input.stock, input.user_source)
        .await?;
    Ok(Json(StockUpdateResponse {
        success: true,
        message: "Stock updated successfully".to_string(),
        data: StockUpdateData::from(&mutation),
    })
    .into_response())
}

/// Apply a batch of stock updates as one all-or-nothing unit
#[utoipa::path(
    post,
    path = "/bulk-update-stock",
    tag = "products",
    request_body = BulkStockUpdateRequest,
    responses(
        (status = 200, description = "All updates applied", body = BulkUpdateReport),
        (status = 422, description = "Batch rejected, nothing committed"),
        (status = 500, description = "Mutation failed")
    )
)]
pub async fn bulk_update_stock<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    ValidatedJson(input): ValidatedJson<BulkStockUpdateRequest>,
) -> InventoryResult<Response> {
    let report = service
        .bulk_update_stock(&input.updates, input.user_source)
        .await?;
    Ok(Json(BulkUpdateResponse {
        success: true,
        updated_count: report.updated_count,
        results: report.results,
    })
    .into_response())
}

/// Products at or below a stock threshold
#[utoipa::path(
    get,
    path = "/low-stock",
    tag = "products",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Low-stock products", body = LowStockAlert),
        (status = 422, description = "Malformed threshold"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn low_stock<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Query(query): Query<LowStockQuery>,
) -> InventoryResult<Response> {
    let threshold = parse_param(query.threshold.as_deref(), "threshold")?;
    let alert = service.low_stock(threshold).await?;
    Ok(Json(ApiResponse::new(alert)).into_response())
}

/// Most recent audit records for one product
#[utoipa::path(
    get,
    path = "/{id}/logs",
    tag = "products",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ProductLogsQuery
    ),
    responses(
        (status = 200, description = "Audit records, newest first"),
        (status = 422, description = "Malformed limit"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn product_logs<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Path(id): Path<i32>,
    Query(query): Query<ProductLogsQuery>,
) -> InventoryResult<Response> {
    let limit = parse_param(query.limit.as_deref(), "limit")?;
    let logs = service.logs_for_product(id, limit).await?;
    let entries: Vec<ProductLogEntry> = logs.iter().map(ProductLogEntry::from).collect();
    Ok(Json(ProductLogsResponse {
        success: true,
        product_id: id,
        count: entries.len(),
        data: entries,
    })
    .into_response())
}
