use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::responses::{ExportJsonResponse, LogListResponse, Period, StatisticsResponse};
use super::{parse_date, parse_param, InventoryResult};
use crate::export::{ExportFormat, ExportPayload};
use crate::models::{ExportQuery, ListLogsQuery, LogFilter, StatisticsQuery};
use crate::repository::InventoryRepository;
use crate::service::InventoryService;

/// List audit records with filters and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "inventory-logs",
    params(ListLogsQuery),
    responses(
        (status = 200, description = "Paginated audit records", body = LogListResponse),
        (status = 422, description = "Malformed filters"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_logs<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Query(query): Query<ListLogsQuery>,
) -> InventoryResult<Response> {
    let filter = LogFilter {
        product_id: parse_param(query.product_id.as_deref(), "product_id")?,
        date_from: parse_date(query.date_from.as_deref(), "date_from")?,
        date_to: parse_date(query.date_to.as_deref(), "date_to")?,
        user_source: query.user_source,
    };
    let page = parse_param(query.page.as_deref(), "page")?;
    let per_page = parse_param(query.per_page.as_deref(), "per_page")?;

    let filters_applied = filter.applied();
    let (entries, pagination) = service.list_logs(filter, page, per_page).await?;

    Ok(Json(LogListResponse {
        success: true,
        data: entries,
        pagination,
        filters_applied,
    })
    .into_response())
}

/// Aggregate statistics over an optional date range
#[utoipa::path(
    get,
    path = "/statistics",
    tag = "inventory-logs",
    params(StatisticsQuery),
    responses(
        (status = 200, description = "Inventory statistics", body = StatisticsResponse),
        (status = 422, description = "Malformed dates"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn statistics<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Query(query): Query<StatisticsQuery>,
) -> InventoryResult<Response> {
    let date_from = parse_date(query.date_from.as_deref(), "date_from")?;
    let date_to = parse_date(query.date_to.as_deref(), "date_to")?;

    let stats = service.statistics(date_from, date_to).await?;
    Ok(Json(StatisticsResponse {
        success: true,
        data: stats,
        period: Period {
            from: date_from
                .map(|d| d.to_string())
                .unwrap_or_else(|| "All time".to_string()),
            to: date_to
                .map(|d| d.to_string())
                .unwrap_or_else(|| "Present".to_string()),
        },
    })
    .into_response())
}

/// Export the newest matching audit records as CSV or JSON
#[utoipa::path(
    get,
    path = "/export",
    tag = "inventory-logs",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV attachment or JSON payload"),
        (status = 422, description = "Malformed filters or format"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn export_logs<R: InventoryRepository>(
    State(service): State<Arc<InventoryService<R>>>,
    Query(query): Query<ExportQuery>,
) -> InventoryResult<Response> {
    let format = ExportFormat::parse(query.format.as_deref())?;
    let filter = LogFilter {
        product_id: parse_param(query.product_id.as_deref(), "product_id")?,
        date_from: parse_date(query.date_from.as_deref(), "date_from")?,
        date_to: parse_date(query.date_to.as_deref(), "date_to")?,
        user_source: None,
    };

    match service.export_logs(filter, format).await? {
        ExportPayload::Csv { filename, content } => {
            let headers = [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ];
            Ok((headers, content).into_response())
        }
        ExportPayload::Json(entries) => Ok(Json(ExportJsonResponse {
            success: true,
            data: entries,
            exported_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .into_response()),
    }
}
