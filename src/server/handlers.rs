use crate::adapters::http::HttpTransport;
use crate::config::MAX_BATCH_SIZE;
use crate::core::dispatcher::BatchDispatcher;
use crate::domain::model::DispatchOutcome;
use crate::utils::validation::validate_url;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<BatchDispatcher<HttpTransport>>,
    pub default_batch_size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
    pub target_url: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// `POST /api`: relays `events` to `targetUrl`, one POST per event.
pub async fn post_events(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RelayResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| bad_request(&format!("Invalid JSON body: {}", e)))?;

    let events = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_request("Invalid events data"))?;

    let target_url = payload
        .get("targetUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| bad_request("Target URL is required"))?;
    validate_url("targetUrl", target_url).map_err(|e| bad_request(&e.to_string()))?;

    let batch_size = match payload.get("batchSize") {
        None | Some(Value::Null) => state.default_batch_size,
        Some(value) => value
            .as_u64()
            .filter(|size| *size > 0)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| bad_request("batchSize must be a positive integer"))?,
    };
    if batch_size > MAX_BATCH_SIZE {
        return Err(bad_request(&format!(
            "batchSize must not exceed {}",
            MAX_BATCH_SIZE
        )));
    }

    debug!(
        "Relay called with {} events for {} (batch size {})",
        events.len(),
        target_url,
        batch_size
    );

    let outcome = state
        .dispatcher
        .dispatch(events, target_url, batch_size, None)
        .await
        .map_err(internal_error)?;

    info!(
        "Relayed {}/{} events to {}",
        outcome.processed_count, outcome.total_events, target_url
    );

    Ok(Json(RelayResponse {
        outcome,
        target_url: target_url.to_string(),
    }))
}

fn bad_request(msg: &str) -> ApiError {
    error!(msg);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_owned(),
        }),
    )
}

fn internal_error<E>(err: E) -> ApiError
where
    E: std::error::Error,
{
    error!("internal error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Internal server error: {}", err),
        }),
    )
}
