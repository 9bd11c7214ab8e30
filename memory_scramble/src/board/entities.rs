//! Board entities: player identifiers, cells, and per-player turn bookkeeping.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Weak;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors a board operation can fail with.
///
/// A mismatch (rule 2-E) is not an error; it is a successful, observable turn
/// outcome. Every failure that relinquishes a first card completes the
/// release before the error is reported.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FlipError {
    #[error("invalid player id")]
    InvalidPlayer,
    #[error("cell ({row},{col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },
    #[error("no card there")]
    NoCard,
    #[error("card is already controlled")]
    SecondControlled,
}

/// A validated player identifier: one or more ASCII word characters.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Validate and wrap a player identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError::InvalidPlayer`] unless the input matches
    /// `[A-Za-z0-9_]+`.
    pub fn new(s: &str) -> Result<Self, FlipError> {
        if !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            Ok(Self(s.to_owned()))
        } else {
            Err(FlipError::InvalidPlayer)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = FlipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One pending first-card acquisition.
///
/// The entry stays in its cell's queue until the owning caller acquires the
/// cell or fails; only the queue head is ever signaled, so arrival order is
/// service order. `alive` mirrors the caller's guard so an abandoned caller
/// can be discarded at signal time.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub id: u64,
    pub alive: Weak<()>,
    pub tx: Option<oneshot::Sender<()>>,
}

/// One board location.
#[derive(Debug)]
pub(crate) struct Cell {
    pub card: Option<String>,
    pub face_up: bool,
    pub controller: Option<PlayerId>,
    pub waiters: VecDeque<Waiter>,
}

impl Cell {
    pub fn new(card: String) -> Self {
        Self {
            card: Some(card),
            face_up: false,
            controller: None,
            waiters: VecDeque::new(),
        }
    }

    /// Drop abandoned waiters from the front of the queue.
    pub fn prune_dead(&mut self) {
        while let Some(head) = self.waiters.front() {
            if head.alive.upgrade().is_some() {
                break;
            }
            self.waiters.pop_front();
        }
    }
}

/// Per-player turn bookkeeping, created lazily on a player's first call.
#[derive(Default, Debug)]
pub(crate) struct PlayerBook {
    /// Cell indices currently controlled, in acquisition order (0, 1, or 2).
    pub controlled: Vec<usize>,
    /// A matched pair awaiting removal at the start of the next turn.
    pub pending_matched: Option<(usize, usize)>,
    /// Mismatch or abandoned-first cells to re-cover on the next turn.
    pub last_revealed: HashSet<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_accepts_word_characters() {
        for ok in ["alice", "p1", "A_B_9", "_"] {
            assert!(PlayerId::new(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn player_id_rejects_bad_input() {
        for bad in ["", "a b", "p-1", "héllo", "a.b", " "] {
            assert_eq!(PlayerId::new(bad), Err(FlipError::InvalidPlayer), "{bad:?}");
        }
    }

    #[test]
    fn player_id_roundtrips_display() {
        let p = PlayerId::new("bob_2").unwrap();
        assert_eq!(p.to_string(), "bob_2");
        assert_eq!(p.as_str(), "bob_2");
    }
}
