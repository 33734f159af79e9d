//! Inventory Domain
//!
//! Products, their stock levels, and the append-only audit trail of every
//! stock change. The one hard guarantee of this crate: a stock write and its
//! audit record commit together or not at all, for single updates and for
//! all-or-nothing bulk batches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← Axum routes, envelopes
//! └──────┬──────┘
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, pagination arithmetic, error taxonomy
//! └──────┬──────┘
//! ┌──────▼──────┐
//! │ Repository  │  ← Atomic transaction scripts (Postgres / in-memory)
//! └──────┬──────┘
//! ┌──────▼──────┐
//! │  Entities   │  ← products, inventory_logs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_inventory::{InventoryConfig, InventoryService, PgInventoryRepository};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//! let repository = PgInventoryRepository::new(db);
//! let service = InventoryService::new(repository, InventoryConfig::default());
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{InventoryError, InventoryResult};
pub use export::{ExportFormat, ExportPayload};
pub use handlers::{logs_router, products_router, ApiDoc};
pub use models::{
    BulkStockUpdateRequest, BulkUpdateEntry, BulkUpdateReport, CreateProduct, InventoryLog,
    InventoryStatistics, LogEntry, LogFilter, LowStockAlert, Pagination, Product, ProductFilter,
    StockMutation, StockUpdateRequest, UpdateProduct,
};
pub use postgres::PgInventoryRepository;
pub use repository::{InMemoryInventoryRepository, InventoryRepository};
pub use service::{InventoryConfig, InventoryService, ProductUpdateOutcome};
