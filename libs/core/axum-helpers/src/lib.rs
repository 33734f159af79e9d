//! # Axum Helpers
//!
//! A collection of utilities, middleware, and helpers for building Axum web
//! applications with a uniform JSON envelope.
//!
//! ## Modules
//!
//! - **[`errors`]**: the failure envelope (`{"success": false, ...}`) and the
//!   [`AppError`] type every domain error converts into
//! - **[`response`]**: the success envelope (`{"success": true, "data": ...}`)
//! - **[`extractors`]**: custom extractors (validated JSON)
//! - **[`http`]**: HTTP middleware (CORS, security headers)
//! - **[`server`]**: server setup, health checks, graceful shutdown

pub mod errors;
pub mod extractors;
pub mod http;
pub mod response;
pub mod server;

// Re-export error types
pub use errors::{AppError, ErrorResponse};

// Re-export the success envelope
pub use response::ApiResponse;

// Re-export extractors
pub use extractors::ValidatedJson;

// Re-export server types
pub use server::{
    create_app, create_production_app, create_router, health_router, run_health_checks,
    shutdown_signal, HealthCheckFuture, HealthResponse, ShutdownCoordinator,
};

// Re-export HTTP middleware
pub use http::{create_cors_layer, create_permissive_cors_layer, security_headers};
