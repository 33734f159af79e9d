//! Audit-log export formatting.

use chrono::{DateTime, Utc};

use crate::error::{InventoryError, InventoryResult};
use crate::models::LogEntry;

/// Requested export format; defaults to CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Parse the `format` query parameter.
    pub fn parse(raw: Option<&str>) -> InventoryResult<Self> {
        match raw {
            None => Ok(Self::Csv),
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some(_) => Err(InventoryError::Validation(
                "The selected format is invalid".to_string(),
            )),
        }
    }
}

/// An export ready to be served.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Csv { filename: String, content: String },
    Json(Vec<LogEntry>),
}

/// Attachment filename stamped with the export time.
pub fn csv_filename(now: DateTime<Utc>) -> String {
    format!("inventory_logs_{}.csv", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Render log entries as CSV with the fixed reporting columns.
pub fn logs_to_csv(entries: &[LogEntry]) -> InventoryResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "ID",
            "Product ID",
            "Product Name",
            "Previous Stock",
            "New Stock",
            "Change Amount",
            "User Source",
            "Date",
        ])
        .map_err(|e| InventoryError::Export(e.to_string()))?;

    for entry in entries {
        writer
            .write_record([
                entry.id.to_string(),
                entry.product_id.to_string(),
                entry.product_name.clone(),
                entry.previous_stock.to_string(),
                entry.new_stock.to_string(),
                entry.change_amount.to_string(),
                entry.user_source.clone(),
                entry.created_at.clone(),
            ])
            .map_err(|e| InventoryError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| InventoryError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| InventoryError::Export(e.to_string()))
}
