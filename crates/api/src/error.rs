//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ValidationErrors};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Field-keyed validation failure.
    Validation(ValidationErrors),
    /// Bad request from the client.
    BadRequest(String),
    /// No valid caller identity.
    Unauthenticated,
    /// The caller may not perform this action.
    Forbidden,
    /// Resource not found.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "error": errors.to_string(), "errors": errors }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "Unauthenticated." }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "error": DomainError::Forbidden.to_string() }),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error." }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ApiError::Validation(errors),
            DomainError::InvalidQuery(msg) => ApiError::BadRequest(msg),
            DomainError::Forbidden => ApiError::Forbidden,
            DomainError::NotFound => ApiError::NotFound(DomainError::NotFound.to_string()),
            DomainError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_422_with_field_errors() {
        let err: ApiError =
            DomainError::validation("status", "The status field is prohibited.").into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "The status field is prohibited.");
        assert_eq!(json["errors"]["status"][0], "The status field is prohibited.");
    }

    #[tokio::test]
    async fn test_domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::InvalidQuery("nope".into()), StatusCode::BAD_REQUEST),
            (DomainError::Forbidden, StatusCode::FORBIDDEN),
            (DomainError::NotFound, StatusCode::NOT_FOUND),
            (
                DomainError::Store(StoreError::InvalidRecord("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error.");
    }

    #[tokio::test]
    async fn test_unauthenticated_is_401() {
        let response = ApiError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Unauthenticated.");
    }
}
