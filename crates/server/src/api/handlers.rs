use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::types::{ApiError, PredictParams, PredictResponse};
use crate::services::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub prediction: Arc<PredictionService>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictResponse>, ApiError> {
    let symbol = params.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ApiError::new("symbol must not be empty"));
    }
    info!("Prediction requested for {}", symbol);

    let prediction = state.prediction.predict(&symbol).await.map_err(|e| {
        warn!("Prediction for {} failed: {}", symbol, e);
        ApiError::from(e)
    })?;

    Ok(Json(PredictResponse {
        signal: prediction.signal.action.signal(),
        confidence: prediction.signal.confidence,
        image_b64: STANDARD.encode(&prediction.latest_frame_png),
        action: prediction.signal.action,
        symbol: prediction.signal.symbol,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::prediction_service::tests::{MockSource, history, service_with};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use market_data::FetchError;

    fn state(source: MockSource, fallback: bool) -> AppState {
        AppState {
            prediction: Arc::new(service_with(source, fallback)),
        }
    }

    fn params(symbol: &str) -> Query<PredictParams> {
        Query(PredictParams {
            symbol: symbol.to_string(),
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_predict_uppercases_symbol() {
        let mut source = MockSource::new();
        source
            .expect_fetch_history()
            .withf(|symbol, _| symbol == "NVDA")
            .returning(|symbol, _| Ok(history(symbol, 45)));

        let Json(body) = predict(State(state(source, false)), params(" nvda "))
            .await
            .unwrap();

        assert_eq!(body.symbol, "NVDA");
        assert_eq!(body.signal, body.action.signal());
        assert!(body.confidence >= 0.8 && body.confidence <= 1.0);

        let png = STANDARD.decode(&body.image_b64).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_response_json_shape() {
        let mut source = MockSource::new();
        source
            .expect_fetch_history()
            .returning(|symbol, _| Ok(history(symbol, 30)));

        let Json(body) = predict(State(state(source, false)), params("aapl"))
            .await
            .unwrap();
        let value = serde_json::to_value(&body).unwrap();

        for key in ["symbol", "signal", "confidence", "image_b64", "action"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(matches!(value["action"].as_str(), Some("BUY" | "HOLD" | "SELL")));
    }

    #[tokio::test]
    async fn test_pipeline_failure_maps_to_bad_request() {
        let mut source = MockSource::new();
        source
            .expect_fetch_history()
            .returning(|symbol, _| Err(FetchError::NoData(symbol.to_string())));

        let err = predict(State(state(source, false)), params("gone"))
            .await
            .unwrap_err();
        assert_eq!(err.detail, "no price data returned for GONE");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_symbol_is_rejected() {
        let source = MockSource::new();

        let err = predict(State(state(source, false)), params("   "))
            .await
            .unwrap_err();

        assert_eq!(err.detail, "symbol must not be empty");
    }

    #[test]
    fn test_symbol_defaults_to_aapl() {
        let params: PredictParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.symbol, "AAPL");
    }
}
