//! Application state management.
//!
//! The shared state passed to request handlers: configuration plus the
//! PostgreSQL connection pool. Cloning is cheap (pool handles are Arc-backed).

use database::postgres::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: DatabaseConnection,
}
