use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::order::OrderError;
use crate::service::ServiceError;

// ============================================================================
// API Error Mapping
// ============================================================================
//
// Every failure crossing the HTTP boundary becomes a JSON envelope:
//   { "success": false, "error": "<message>" }
//
// Validation problems map to 400, unknown tracking ids to 404, bad admin
// credentials to 403, storage failures to 500 (logged, not retried).
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Unauthorized: admin only")]
    Unauthorized,
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Service(ServiceError::Order(err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Order(OrderError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Service(ServiceError::Order(_)) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Service(ServiceError::Store(e)) = self {
            tracing::error!(error = %e, "Storage failure surfaced to client");
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
