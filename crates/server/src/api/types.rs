use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::models::Action;
use serde::{Deserialize, Serialize};

fn default_symbol() -> String {
    "AAPL".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub symbol: String,
    /// -1 sell, 0 hold, 1 buy.
    pub signal: i8,
    pub confidence: f64,
    /// Base64 PNG of the latest chart frame.
    pub image_b64: String,
    pub action: Action,
}

/// Every pipeline failure is reported as a 400 with a `detail` message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl<E: std::error::Error> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self::new(err.to_string())
    }
}
