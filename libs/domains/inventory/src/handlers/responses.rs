//! Response shapes for endpoints whose envelope carries more than `data`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{InventoryLog, InventoryStatistics, LogEntry, Pagination, StockMutation};

/// Paginated product list: `{"success": true, "data": [...], "count": ..., "pagination": ...}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub success: bool,
    pub data: Vec<crate::models::Product>,
    pub count: usize,
    pub pagination: Pagination,
}

/// Payload of the legacy stock-update endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockUpdateData {
    pub product_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
}

impl From<&StockMutation> for StockUpdateData {
    fn from(mutation: &StockMutation) -> Self {
        Self {
            product_id: mutation.product.id,
            previous_stock: mutation.log.previous_stock,
            new_stock: mutation.log.new_stock,
            change_amount: mutation.change_amount,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockUpdateResponse {
    pub success: bool,
    pub message: String,
    pub data: StockUpdateData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub success: bool,
    pub updated_count: usize,
    pub results: Vec<StockMutation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogListResponse {
    pub success: bool,
    pub data: Vec<LogEntry>,
    pub pagination: Pagination,
    #[schema(value_type = Object)]
    pub filters_applied: serde_json::Value,
}

/// Per-product history row (the product fields are implied by the route).
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductLogEntry {
    pub id: i64,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub formatted_change: String,
    pub user_source: String,
    pub created_at: String,
}

impl From<&InventoryLog> for ProductLogEntry {
    fn from(log: &InventoryLog) -> Self {
        Self {
            id: log.id,
            previous_stock: log.previous_stock,
            new_stock: log.new_stock,
            change_amount: log.change_amount,
            formatted_change: log.formatted_change(),
            user_source: log.user_source.clone(),
            created_at: log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductLogsResponse {
    pub success: bool,
    pub product_id: i32,
    pub data: Vec<ProductLogEntry>,
    pub count: usize,
}

/// Date range echoed back by the statistics endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct Period {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: InventoryStatistics,
    pub period: Period,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExportJsonResponse {
    pub success: bool,
    pub data: Vec<LogEntry>,
    pub exported_at: String,
}
