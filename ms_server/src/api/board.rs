//! Board route handlers.
//!
//! All board responses are `text/plain` board views; failures carry the rule
//! error text with a 400 for bad input and a 409 for rule violations.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use memory_scramble::board::{Board, FlipError, PlayerId};

use super::AppState;
use crate::metrics;

type BoardResponse = Result<String, (StatusCode, String)>;

fn require_board(state: &AppState) -> Result<Arc<Board>, (StatusCode, String)> {
    state.board.clone().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "no board is loaded".to_string(),
    ))
}

fn player_id(raw: &str) -> Result<PlayerId, (StatusCode, String)> {
    PlayerId::new(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// Parse a `row,col` path segment.
fn position(raw: &str) -> Result<(usize, usize), (StatusCode, String)> {
    raw.split_once(',')
        .and_then(|(r, c)| Some((r.parse().ok()?, c.parse().ok()?)))
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("malformed position {raw:?}, expected row,col"),
            )
        })
}

fn flip_status(err: &FlipError) -> (StatusCode, &'static str) {
    match err {
        FlipError::InvalidPlayer => (StatusCode::BAD_REQUEST, "invalid_player"),
        FlipError::OutOfBounds { .. } => (StatusCode::BAD_REQUEST, "out_of_bounds"),
        FlipError::NoCard => (StatusCode::CONFLICT, "no_card"),
        FlipError::SecondControlled => (StatusCode::CONFLICT, "second_controlled"),
    }
}

/// `GET /look/{player}` - snapshot of the board as seen by the player.
pub async fn look(State(state): State<AppState>, Path(player): Path<String>) -> BoardResponse {
    let board = require_board(&state)?;
    let player = player_id(&player)?;
    Ok(board.look(&player).await)
}

/// `GET /flip/{player}/{row},{col}` - flip a card.
///
/// May long-poll: a contended first card suspends until the cell frees up.
pub async fn flip(
    State(state): State<AppState>,
    Path((player, pos)): Path<(String, String)>,
) -> BoardResponse {
    let board = require_board(&state)?;
    let player = player_id(&player)?;
    let (row, col) = position(&pos)?;
    match board.flip(&player, row, col).await {
        Ok(view) => {
            metrics::flip_total("ok");
            Ok(view)
        }
        Err(err) => {
            let (status, outcome) = flip_status(&err);
            metrics::flip_total(outcome);
            Err((status, err.to_string()))
        }
    }
}

/// `GET /watch/{player}` - long-poll until the board changes.
pub async fn watch(State(state): State<AppState>, Path(player): Path<String>) -> BoardResponse {
    let board = require_board(&state)?;
    let player = player_id(&player)?;
    metrics::watch_total();
    Ok(board.watch(&player).await)
}

/// `GET /replace/{player}/{old}/{new}` - substitute every `old` card with
/// `new`, preserving face and control state.
pub async fn replace(
    State(state): State<AppState>,
    Path((player, old, new)): Path<(String, String, String)>,
) -> BoardResponse {
    let board = require_board(&state)?;
    let player = player_id(&player)?;
    metrics::replace_total();
    Ok(board
        .map_cards(&player, |card| {
            if card == old { new.clone() } else { card.to_string() }
        })
        .await)
}
