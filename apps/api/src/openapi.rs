//! OpenAPI documentation served at /swagger-ui, /redoc, /rapidoc, and /scalar.

pub use domain_inventory::ApiDoc;
