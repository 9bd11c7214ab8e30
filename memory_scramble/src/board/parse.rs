//! Board file parsing.
//!
//! The format is line oriented: the first non-blank line is `HxW`, followed
//! by exactly `H * W` non-blank card label lines in row-major order. Blank
//! lines are ignored everywhere.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::engine::Board;

/// Board file failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read board file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed dimension line {0:?}, expected HxW with H, W > 0")]
    DimensionLine(String),
    #[error("expected {expected} cards, found {found}")]
    CardCount { expected: usize, found: usize },
}

/// Parse a board from text. All cells start face down and unowned.
pub fn parse(text: &str) -> Result<Board, ParseError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let dims = lines
        .next()
        .ok_or_else(|| ParseError::DimensionLine(String::new()))?;
    let (height, width) = dims
        .split_once('x')
        .and_then(|(h, w)| Some((h.parse::<usize>().ok()?, w.parse::<usize>().ok()?)))
        .filter(|&(h, w)| h > 0 && w > 0)
        .ok_or_else(|| ParseError::DimensionLine(dims.to_string()))?;

    let cards: Vec<String> = lines.map(str::to_string).collect();
    let expected = height * width;
    if cards.len() != expected {
        return Err(ParseError::CardCount {
            expected,
            found: cards.len(),
        });
    }

    Ok(Board::from_grid(height, width, cards))
}

/// Read and parse a board file.
pub fn load(path: impl AsRef<Path>) -> Result<Board, ParseError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}
