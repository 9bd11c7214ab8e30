//! HTTP API for the board and the replicated key/value store.
//!
//! Three route sets, one per [`Mode`]:
//!
//! ```text
//! GET  /health                        - liveness and role info (all modes)
//!
//! GET  /look/{player}                 - board snapshot as text/plain
//! GET  /flip/{player}/{row},{col}     - flip a card; rule failures are 4xx
//! GET  /watch/{player}                - long-poll for the next board change
//! GET  /replace/{player}/{old}/{new}  - board-wide card substitution
//!
//! POST /write                         - leader quorum write
//! POST /replicate                     - follower replication intake
//! GET  /read?key=K                    - local read (leader and follower)
//! GET  /store                         - dump the local map (leader and follower)
//! ```
//!
//! The core surfaces structured error kinds; this layer maps them onto
//! status codes: bad input is 400, rule failures are 409, a missed write
//! quorum is 503, an absent read key is 404.

pub mod board;
pub mod kv;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use memory_scramble::board::Board;
use memory_scramble::kv::{Follower, Leader, Store};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::config::Mode;

/// Application state shared across all handlers.
///
/// Cloned per request; the `Arc` wrappers make that cheap. Exactly one of
/// `board`, `leader`, `follower` is populated, matching `mode`.
#[derive(Clone)]
pub struct AppState {
    pub mode: Mode,
    pub board: Option<Arc<Board>>,
    pub leader: Option<Arc<Leader>>,
    pub follower: Option<Arc<Follower>>,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn board(board: Arc<Board>) -> Self {
        Self {
            mode: Mode::Board,
            board: Some(board),
            leader: None,
            follower: None,
            store: Arc::new(Store::new()),
        }
    }

    pub fn leader(leader: Arc<Leader>) -> Self {
        let store = Arc::clone(leader.store());
        Self {
            mode: Mode::Leader,
            board: None,
            leader: Some(leader),
            follower: None,
            store,
        }
    }

    pub fn follower(follower: Arc<Follower>) -> Self {
        let store = Arc::clone(follower.store());
        Self {
            mode: Mode::Follower,
            board: None,
            leader: None,
            follower: Some(follower),
            store,
        }
    }
}

/// Create the router for the configured mode.
pub fn create_router(state: AppState) -> Router {
    let role_routes = match state.mode {
        Mode::Board => Router::new()
            .route("/look/{player}", get(board::look))
            .route("/flip/{player}/{pos}", get(board::flip))
            .route("/watch/{player}", get(board::watch))
            .route("/replace/{player}/{old}/{new}", get(board::replace)),
        Mode::Leader => Router::new()
            .route("/write", post(kv::write))
            .route("/read", get(kv::read))
            .route("/store", get(kv::dump)),
        Mode::Follower => Router::new()
            .route("/replicate", post(kv::replicate))
            .route("/read", get(kv::read))
            .route("/store", get(kv::dump)),
    };

    Router::new()
        .route("/health", get(health))
        .merge(role_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and the test drivers.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let body = match (&state.board, &state.leader, &state.follower) {
        (Some(board), _, _) => json!({
            "status": "healthy",
            "role": "board",
            "height": board.height(),
            "width": board.width(),
            "version": board.version().await,
        }),
        (_, Some(leader), _) => json!({
            "status": "healthy",
            "role": "leader",
            "followers": leader.followers(),
            "write_quorum": leader.write_quorum(),
            "store_size": state.store.len().await,
        }),
        (_, _, Some(follower)) => json!({
            "status": "healthy",
            "role": "follower",
            "follower_id": follower.id(),
            "store_size": state.store.len().await,
        }),
        _ => json!({ "status": "healthy" }),
    };
    Json(body)
}
