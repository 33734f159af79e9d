use axum::{routing::get, Router};
use domain_inventory::{logs_router, products_router, InventoryService, PgInventoryRepository};
use std::time::Duration;

pub mod health;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix is added by the `create_router` helper.
///
/// Takes a reference to AppState and initializes the inventory service once;
/// both routers share it (Arc clones only).
pub fn routes(state: &crate::state::AppState) -> Router {
    let repository = PgInventoryRepository::new(state.db.clone()).with_statement_timeout(
        Duration::from_secs(state.config.database.statement_timeout_secs),
    );
    let service = InventoryService::new(repository, state.config.inventory.clone());

    Router::new()
        .nest("/products", products_router(service.clone()))
        .nest("/inventory-logs", logs_router(service))
}

/// Creates a router with the /ready endpoint that performs a live database
/// ping, for merging with the stateless app router from `create_router`.
pub fn ready_router(state: crate::state::AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
