//! # Memory Scramble
//!
//! The concurrency core of a multiplayer Memory-Scramble game plus a small
//! quorum-replicated key/value store. The two halves are independent and each
//! is usable on its own.
//!
//! ## Architecture
//!
//! - [`board`]: a shared mutable game board mediating contention between many
//!   concurrent players. First-card acquisitions serialize per cell in FIFO
//!   order, second-card attempts never block, matched pairs are removed lazily
//!   at the start of the owner's next turn, and a version-counter watch
//!   channel lets observers long-poll for changes without busy waiting.
//! - [`kv`]: a single-writer leader that fans each write out to N followers
//!   under simulated network delay and reports success once W follower
//!   acknowledgements have arrived, while the remaining replications finish
//!   in the background.
//!
//! ## Example
//!
//! ```
//! use memory_scramble::board::{self, PlayerId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let board = board::parse("2x2\nA\nB\nA\nB\n").unwrap();
//!     let alice = PlayerId::new("alice").unwrap();
//!
//!     let view = board.flip(&alice, 0, 0).await.unwrap();
//!     assert!(view.starts_with("2x2\n"));
//!     assert!(view.contains("my A"));
//! }
//! ```

/// Concurrent game board: state, rule engine, watch channel, parsing.
pub mod board;
pub use board::{Board, FlipError, ParseError, PlayerId};

/// Replicated key/value store: replica stores, leader fanout, transport.
pub mod kv;
pub use kv::{Follower, Leader, Store, WriteError};
