//! HTTP glue around the conversion engine.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::convert::{ConversionEngine, ConvertError};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversionEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/convert", get(convert))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ConvertParams {
    amount: f64,
    from: String,
    to: String,
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConvertResponse {
    amount: f64,
    from_currency: String,
    to_currency: String,
    converted_amount: f64,
    rate: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        let (status, kind) = match &err {
            ConvertError::SymbolNotSupported(_) => (StatusCode::BAD_REQUEST, "symbol_not_supported"),
            ConvertError::UnsupportedConversion { .. } => {
                (StatusCode::BAD_REQUEST, "unsupported_conversion")
            }
            ConvertError::QuotesNotFound { .. } => (StatusCode::NOT_FOUND, "quotes_not_found"),
            ConvertError::QuotesOutdated(_) => (StatusCode::BAD_REQUEST, "quotes_outdated"),
            ConvertError::Internal(e) => {
                error!(error = %e, "Conversion failed unexpectedly");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: "internal_error",
                    message: "An unexpected error occurred during conversion".to_string(),
                };
            }
        };
        Self {
            status,
            error: kind,
            message: err.to_string(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "coinconv API is running",
        "status": "healthy",
    }))
}

async fn convert(
    State(state): State<AppState>,
    Query(params): Query<ConvertParams>,
) -> Result<Json<ConvertResponse>, ApiError> {
    if !(params.amount > 0.0) {
        return Err(ApiError::bad_request(
            "invalid_amount",
            "Amount must be a positive number",
        ));
    }

    let at = match &params.timestamp {
        Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
            ApiError::bad_request(
                "invalid_timestamp",
                "Timestamp must be in ISO format (e.g. '2025-08-12T12:00:00Z')",
            )
        })?),
        None => None,
    };

    let result = state
        .engine
        .convert(&params.from, &params.to, params.amount, at)
        .await?;

    Ok(Json(ConvertResponse {
        amount: result.amount,
        from_currency: result.from_symbol,
        to_currency: result.to_symbol,
        converted_amount: result.converted_amount,
        rate: result.rate,
        timestamp: result.timestamp,
    }))
}

/// Parses an ISO-8601 timestamp. A naive timestamp (no `Z` or offset) is
/// interpreted as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
