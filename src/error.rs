// =============================================================================
// Route-boundary error taxonomy
// =============================================================================
//
// Upstream clients work in `anyhow::Result`. Handlers convert those failures
// into one of the variants below, which render as a fixed `{ "error": ... }`
// JSON body. A symbol the provider does not recognise is reported the same
// way as a transport failure.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure, non-2xx status, or a response missing the price.
    #[error("{0}")]
    UpstreamUnavailable(&'static str),

    /// A required request field is missing or malformed.
    #[error("{0}")]
    InvalidInput(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::UpstreamUnavailable("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::InvalidInput("x").status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn renders_fixed_error_body() {
        let resp = ApiError::InvalidInput("Invalid data").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Invalid data" }));
    }
}
