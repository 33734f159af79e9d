//! Success envelope shared by all JSON endpoints.

use serde::Serialize;

/// Standard success envelope: `{"success": true, "data": ..., "message"?: ...}`.
///
/// Endpoints with richer payloads (pagination, counts) define their own
/// response structs; this covers the common single-object case.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always `true`
    pub success: bool,
    /// Optional human-readable message ("Product created successfully")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::new(serde_json::json!({"id": 1}))).unwrap();
        assert_eq!(body["success"], serde_json::json!(true));
        assert_eq!(body["data"]["id"], serde_json::json!(1));
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_success_envelope_with_message() {
        let body = serde_json::to_value(ApiResponse::with_message(
            serde_json::json!(null),
            "Product deleted successfully",
        ))
        .unwrap();
        assert_eq!(body["message"], "Product deleted successfully");
    }
}
