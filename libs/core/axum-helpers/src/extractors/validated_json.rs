//! JSON extractor with automatic validation using the validator crate.

use crate::errors::{validation_errors_to_json, ErrorResponse};
use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Deserializes the body, runs the `Validate` derive, and rejects with the
/// standard 422 failure envelope when validation fails:
///
/// ```json
/// {
///   "success": false,
///   "message": "Validation failed",
///   "errors": { "name": ["length must be between 1 and 255"] }
/// }
/// ```
///
/// # Example
/// ```ignore
/// use axum_helpers::extractors::ValidatedJson;
///
/// async fn create_product(
///     ValidatedJson(payload): ValidatedJson<CreateProduct>,
/// ) -> impl IntoResponse {
///     /* payload passed validation */
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await.map_err(|e| {
            let body = ErrorResponse::new(e.body_text());
            (e.status(), axum::Json(body)).into_response()
        })?;

        data.validate().map_err(|e| {
            let body =
                ErrorResponse::with_errors("Validation failed", validation_errors_to_json(&e));
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response()
        })?;

        Ok(ValidatedJson(data))
    }
}
