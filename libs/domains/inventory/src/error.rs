use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

/// Error taxonomy for the inventory engine.
///
/// Mutation failures always mean the transaction rolled back and no state
/// changed; the wrapped cause is carried for diagnostics only.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0}")]
    Validation(String),

    #[error("Product with ID {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Conflict(String),

    /// The whole bulk batch was rejected; nothing was committed.
    #[error("Bulk update failed")]
    BulkRejected(Vec<String>),

    /// A storage failure inside the stock-mutation transaction.
    #[error("Failed to update stock: {0}")]
    MutationFailed(#[source] DbErr),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Convert InventoryError to AppError for standardized error responses
impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => AppError::UnprocessableEntity(msg),
            InventoryError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
            InventoryError::Conflict(msg) => AppError::Conflict(msg),
            InventoryError::BulkRejected(errors) => AppError::UnprocessableEntityWithErrors {
                message: "Bulk update failed".to_string(),
                errors: serde_json::json!(errors),
            },
            err @ InventoryError::MutationFailed(_) => {
                AppError::InternalServerError(err.to_string())
            }
            InventoryError::Export(msg) => {
                AppError::InternalServerError(format!("Export failed: {}", msg))
            }
            err @ InventoryError::Database(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
