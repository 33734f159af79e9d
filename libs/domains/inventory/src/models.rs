use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Source tag recorded on the audit entry created alongside a new product.
pub const CREATION_SOURCE: &str = "creation";
/// Default source tag for single stock updates when the caller omits one.
pub const DEFAULT_API_SOURCE: &str = "api";
/// Default source tag for bulk stock updates when the caller omits one.
pub const DEFAULT_BULK_SOURCE: &str = "bulk_api";

/// Product entity - the `current_stock` field is the single source of truth
/// for on-hand quantity and is only ever written through the stock-mutation
/// scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    /// Unique across all products
    pub reference: String,
    pub current_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable audit record for a stock change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryLog {
    pub id: i64,
    pub product_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    /// Always `new_stock - previous_stock`, recomputed by the mutation
    /// scripts and never accepted from a caller.
    pub change_amount: i32,
    pub user_source: String,
    pub created_at: DateTime<Utc>,
}

impl InventoryLog {
    /// Signed display form of the delta: "+50", "-100", "+0".
    pub fn formatted_change(&self) -> String {
        if self.change_amount >= 0 {
            format!("+{}", self.change_amount)
        } else {
            self.change_amount.to_string()
        }
    }
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Generated by the service when omitted
    #[validate(length(min = 1, max = 100))]
    pub reference: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub current_stock: i32,
}

/// DTO for updating product fields.
///
/// When `current_stock` is present the update is routed through the audited
/// stock-mutation path; other fields are written directly.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub reference: Option<String>,
    #[validate(range(min = 0))]
    pub current_stock: Option<i32>,
    pub user_source: Option<String>,
}

/// Resolved product data handed to the repository (reference already
/// generated when the caller omitted one).
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub reference: String,
    pub current_stock: i32,
}

/// Non-stock field changes handed to the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFieldUpdate {
    pub name: Option<String>,
    pub reference: Option<String>,
}

/// Body of the legacy single stock-update endpoint.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StockUpdateRequest {
    pub stock: i32,
    #[validate(length(min = 1, max = 255))]
    pub user_source: Option<String>,
}

/// One entry of a bulk update as received over the wire. Both fields are
/// optional so a structurally broken entry can be reported instead of
/// rejected by deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkUpdateEntry {
    pub product_id: Option<i32>,
    pub stock: Option<i32>,
}

/// Body of the bulk stock-update endpoint.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkStockUpdateRequest {
    #[validate(length(min = 1))]
    pub updates: Vec<BulkUpdateEntry>,
    pub user_source: Option<String>,
}

/// A structurally valid bulk entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockLevel {
    pub product_id: i32,
    pub stock: i32,
}

/// Result of one committed stock mutation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StockMutation {
    pub product: Product,
    pub log: InventoryLog,
    pub change_amount: i32,
}

/// Result of a committed bulk update.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BulkUpdateReport {
    pub updated_count: usize,
    pub results: Vec<StockMutation>,
}

/// Filters for product listing, AND-combined; string matches are
/// case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Matches name OR reference
    pub search: Option<String>,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
}

/// Filters for audit-log queries, AND-combined. Date bounds are inclusive
/// calendar dates on `created_at`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub product_id: Option<i32>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring match
    pub user_source: Option<String>,
}

impl LogFilter {
    /// Whether a log row passes every set filter. Used by the in-memory
    /// store; the Postgres store translates the same predicate to SQL.
    pub fn matches(&self, log: &InventoryLog) -> bool {
        if let Some(product_id) = self.product_id {
            if log.product_id != product_id {
                return false;
            }
        }
        let date = log.created_at.date_naive();
        if let Some(from) = self.date_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if date > to {
                return false;
            }
        }
        if let Some(ref term) = self.user_source {
            if !log
                .user_source
                .to_lowercase()
                .contains(&term.to_lowercase())
            {
                return false;
            }
        }
        true
    }

    /// The filters that are actually set, echoed back in list responses.
    pub fn applied(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(product_id) = self.product_id {
            map.insert("product_id".into(), serde_json::json!(product_id));
        }
        if let Some(from) = self.date_from {
            map.insert("date_from".into(), serde_json::json!(from.to_string()));
        }
        if let Some(to) = self.date_to {
            map.insert("date_to".into(), serde_json::json!(to.to_string()));
        }
        if let Some(ref source) = self.user_source {
            map.insert("user_source".into(), serde_json::json!(source));
        }
        serde_json::Value::Object(map)
    }
}

/// Pagination metadata computed with explicit arithmetic so the numbers are
/// reproducible regardless of the storage backend:
/// `last_page = ceil(total / per_page)`, `from = (page-1)*per_page + 1`
/// (0 when empty), `to = min(from + per_page - 1, total)`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: u64,
    pub to: u64,
    pub has_more_pages: bool,
}

impl Pagination {
    /// `per_page` must be non-zero; the service clamps it before calling.
    pub fn new(current_page: u64, per_page: u64, total: u64) -> Self {
        let last_page = total.div_ceil(per_page);
        let from = if total == 0 {
            0
        } else {
            (current_page - 1) * per_page + 1
        };
        let to = (from + per_page - 1).min(total);
        Self {
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
            has_more_pages: current_page < last_page,
        }
    }
}

/// Audit row joined with its product's display fields, as served by the
/// log-listing and export endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LogEntry {
    pub id: i64,
    pub product_id: i32,
    pub product_name: String,
    pub product_reference: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub formatted_change: String,
    pub user_source: String,
    /// Formatted "YYYY-MM-DD HH:MM:SS"
    pub created_at: String,
}

impl LogEntry {
    pub fn from_parts(log: &InventoryLog, product: Option<(&str, &str)>) -> Self {
        let (product_name, product_reference) = match product {
            Some((name, reference)) => (name.to_string(), reference.to_string()),
            None => ("Unknown".to_string(), "Unknown".to_string()),
        };
        Self {
            id: log.id,
            product_id: log.product_id,
            product_name,
            product_reference,
            previous_stock: log.previous_stock,
            new_stock: log.new_stock,
            change_amount: log.change_amount,
            formatted_change: log.formatted_change(),
            user_source: log.user_source.clone(),
            created_at: log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Aggregates over the audit log in an optional date range.
///
/// `net_change` always equals the sum of every `change_amount` in range.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InventoryStatistics {
    pub total_logs: u64,
    pub total_stock_increases: i64,
    /// Absolute value of the summed negative deltas
    pub total_stock_decreases: i64,
    pub net_change: i64,
}

/// Products at or below a stock threshold.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LowStockAlert {
    pub threshold: i32,
    pub count: usize,
    pub products: Vec<Product>,
}

/// Query parameters for product listing.
///
/// Numeric fields arrive as raw strings and are parsed by the handlers so a
/// malformed filter yields a 422 validation failure rather than an extractor
/// rejection.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub min_stock: Option<String>,
    pub max_stock: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Query parameters for audit-log listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListLogsQuery {
    pub product_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub user_source: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Query parameters for statistics.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StatisticsQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Query parameters for the export endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub product_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Query parameters for the low-stock alert.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LowStockQuery {
    pub threshold: Option<String>,
}

/// Query parameters for per-product history.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProductLogsQuery {
    pub limit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn log(change_amount: i32) -> InventoryLog {
        InventoryLog {
            id: 1,
            product_id: 1,
            previous_stock: 10,
            new_stock: 10 + change_amount,
            change_amount,
            user_source: "system".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_pagination_mid_page() {
        // total=47, per_page=10, page=3
        let p = Pagination::new(3, 10, 47);
        assert_eq!(p.from, 21);
        assert_eq!(p.to, 30);
        assert_eq!(p.last_page, 5);
        assert!(p.has_more_pages);
    }

    #[test]
    fn test_pagination_last_page_is_partial() {
        let p = Pagination::new(5, 10, 47);
        assert_eq!(p.from, 41);
        assert_eq!(p.to, 47);
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_pagination_empty_result() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.from, 0);
        assert_eq!(p.to, 0);
        assert_eq!(p.last_page, 0);
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let p = Pagination::new(2, 10, 20);
        assert_eq!(p.from, 11);
        assert_eq!(p.to, 20);
        assert_eq!(p.last_page, 2);
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_formatted_change_signs() {
        assert_eq!(log(50).formatted_change(), "+50");
        assert_eq!(log(-100).formatted_change(), "-100");
        assert_eq!(log(0).formatted_change(), "+0");
    }

    #[test]
    fn test_log_filter_date_range_is_inclusive() {
        let entry = log(5);
        let mut filter = LogFilter {
            date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&entry));

        filter.date_to = Some(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn test_log_filter_user_source_is_case_insensitive_substring() {
        let mut entry = log(5);
        entry.user_source = "WooCommerce-Sync".to_string();

        let filter = LogFilter {
            user_source: Some("woocommerce".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&entry));

        let filter = LogFilter {
            user_source: Some("prestashop".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn test_log_filter_applied_echoes_set_fields_only() {
        let filter = LogFilter {
            product_id: Some(3),
            date_from: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ..Default::default()
        };
        let applied = filter.applied();
        assert_eq!(applied["product_id"], serde_json::json!(3));
        assert_eq!(applied["date_from"], serde_json::json!("2024-01-01"));
        assert!(applied.get("user_source").is_none());
    }

    #[test]
    fn test_log_entry_unknown_product() {
        let entry = LogEntry::from_parts(&log(5), None);
        assert_eq!(entry.product_name, "Unknown");
        assert_eq!(entry.product_reference, "Unknown");
        assert_eq!(entry.created_at, "2024-03-15 12:30:00");
        assert_eq!(entry.formatted_change, "+5");
    }
}
