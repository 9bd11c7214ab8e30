//! Key/value route handlers for the leader and follower roles.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub key: String,
    pub value: String,
    /// Follower acknowledgements in hand when the quorum was met.
    pub confirmations: usize,
    pub latency_ms: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ReplicateResponse {
    pub success: bool,
    pub key: String,
    pub value: String,
    pub follower_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type KvError = (StatusCode, Json<ErrorResponse>);

fn kv_error(status: StatusCode, error: impl Into<String>) -> KvError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn require_key(key: &str) -> Result<(), KvError> {
    if key.is_empty() {
        Err(kv_error(StatusCode::BAD_REQUEST, "key must not be empty"))
    } else {
        Ok(())
    }
}

/// `POST /write` - leader-only quorum write.
pub async fn write(
    State(state): State<AppState>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, KvError> {
    let leader = state
        .leader
        .as_ref()
        .ok_or_else(|| kv_error(StatusCode::SERVICE_UNAVAILABLE, "not the leader"))?;
    require_key(&request.key)?;

    match leader.write(request.key.clone(), request.value.clone()).await {
        Ok(outcome) => {
            metrics::write_total("ok");
            metrics::write_latency_ms(outcome.latency_ms);
            Ok(Json(WriteResponse {
                success: true,
                key: request.key,
                value: request.value,
                confirmations: outcome.confirmations,
                latency_ms: outcome.latency_ms,
            }))
        }
        Err(err) => {
            metrics::write_total("quorum_failed");
            Err(kv_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
        }
    }
}

/// `GET /read?key=K` - local read, served by leader or follower alike.
pub async fn read(
    State(state): State<AppState>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<ReadResponse>, KvError> {
    let key = query
        .key
        .ok_or_else(|| kv_error(StatusCode::BAD_REQUEST, "key parameter is required"))?;
    require_key(&key)?;
    match state.store.get(&key).await {
        Some(value) => Ok(Json(ReadResponse { key, value })),
        None => Err(kv_error(StatusCode::NOT_FOUND, "key not found")),
    }
}

/// `POST /replicate` - follower-only replication intake.
pub async fn replicate(
    State(state): State<AppState>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<ReplicateResponse>, KvError> {
    let follower = state
        .follower
        .as_ref()
        .ok_or_else(|| kv_error(StatusCode::SERVICE_UNAVAILABLE, "not a follower"))?;
    require_key(&request.key)?;

    follower
        .replicate(request.key.clone(), request.value.clone())
        .await;
    metrics::replicate_intake_total();
    Ok(Json(ReplicateResponse {
        success: true,
        key: request.key,
        value: request.value,
        follower_id: follower.id().to_string(),
    }))
}

/// `GET /store` - dump the entire local map, for testing and verification.
pub async fn dump(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    Json(state.store.dump().await)
}
