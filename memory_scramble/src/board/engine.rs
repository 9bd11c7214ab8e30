//! The board engine: rule enforcement, per-cell fairness, and change
//! notification.
//!
//! All state lives behind one [`tokio::sync::Mutex`]. Blocking callers (first
//! card contenders) park on one-shot channels queued per cell; the queue head
//! is the only waiter ever signaled, so a cell serves its contenders in
//! arrival order. Version bumps fan out through a [`watch`] channel, which is
//! what `watch` long-polls on.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::debug;
use tokio::sync::{Mutex, oneshot, watch};

use super::entities::{Cell, FlipError, PlayerBook, PlayerId, Waiter};

/// The shared Memory-Scramble board.
///
/// One instance per process, created by [`super::parse`] and shared behind an
/// `Arc`. All operations take `&self` and are safe to call from any number of
/// tasks.
#[derive(Debug)]
pub struct Board {
    height: usize,
    width: usize,
    inner: Mutex<BoardInner>,
    /// In-progress `map` regions, keyed by source card value. An entry is
    /// removed when its finishing holder is the last reference besides the
    /// registry itself.
    regions: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

#[derive(Debug)]
struct BoardInner {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
    players: HashMap<PlayerId, PlayerBook>,
    version: u64,
    next_waiter: u64,
    version_tx: watch::Sender<u64>,
}

impl Board {
    pub(crate) fn from_grid(height: usize, width: usize, cards: Vec<String>) -> Self {
        let cells = cards.into_iter().map(Cell::new).collect();
        let (version_tx, _) = watch::channel(0);
        Self {
            height,
            width,
            inner: Mutex::new(BoardInner {
                height,
                width,
                cells,
                players: HashMap::new(),
                version: 0,
                next_waiter: 0,
                version_tx,
            }),
            regions: Mutex::new(HashMap::new()),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Current change counter. Monotonically non-decreasing.
    pub async fn version(&self) -> u64 {
        self.inner.lock().await.version
    }

    /// Render the board as seen by `player`.
    ///
    /// Side-effect free: does not touch the version counter or any turn
    /// state.
    pub async fn look(&self, player: &PlayerId) -> String {
        self.inner.lock().await.render(player)
    }

    /// Flip the cell at (`row`, `col`) for `player`.
    ///
    /// First-card attempts run the turn-start cleanup and may suspend until
    /// the cell becomes free; contenders on one cell are served in FIFO
    /// order. Second-card attempts never suspend: they match, mismatch, or
    /// fail immediately.
    ///
    /// # Errors
    ///
    /// [`FlipError::OutOfBounds`] for a bad coordinate, [`FlipError::NoCard`]
    /// when the target card has been removed (before or while waiting), and
    /// [`FlipError::SecondControlled`] when a second card is already held by
    /// somebody. The latter two release the caller's first card first.
    pub async fn flip(
        &self,
        player: &PlayerId,
        row: usize,
        col: usize,
    ) -> Result<String, FlipError> {
        if row >= self.height || col >= self.width {
            return Err(FlipError::OutOfBounds { row, col });
        }
        let target = row * self.width + col;

        let mut signal: Option<oneshot::Receiver<()>> = None;
        let mut ticket: Option<(u64, Arc<()>)> = None;
        let mut cleaned = false;
        loop {
            if let Some(rx) = signal.take() {
                // Park outside the lock until the head slot is signaled.
                let _ = rx.await;
            }

            let mut inner = self.inner.lock().await;
            if !cleaned {
                inner.ensure_player(player);
                if let Some(first) = inner.single_controlled(player) {
                    let outcome = inner.flip_second(player, first, target);
                    return outcome.map(|()| inner.render(player));
                }
                inner.turn_cleanup(player);
                cleaned = true;
            }

            inner.cells[target].prune_dead();
            let parked_id = ticket.as_ref().map(|(id, _guard)| *id);
            match parked_id {
                None => {
                    let cell = &inner.cells[target];
                    if cell.card.is_none() {
                        return Err(FlipError::NoCard);
                    }
                    if cell.controller.is_none() && cell.waiters.is_empty() {
                        inner.acquire(player, target);
                        return Ok(inner.render(player));
                    }
                    // A free cell with a queued, unsignaled head means a
                    // wakeup was lost to an abandoned caller; resend it
                    // before queuing behind.
                    if cell.controller.is_none() {
                        inner.signal_head(target);
                    }
                    let (id, guard, rx) = inner.enqueue_waiter(target);
                    ticket = Some((id, guard));
                    signal = Some(rx);
                }
                Some(id) => {
                    let cell = &inner.cells[target];
                    let head_is_me = cell.waiters.front().is_some_and(|w| w.id == id);
                    if head_is_me && cell.card.is_none() {
                        inner.pop_waiter(target, id);
                        // The card is gone for everyone behind us too.
                        inner.signal_head(target);
                        return Err(FlipError::NoCard);
                    }
                    if head_is_me && cell.controller.is_none() {
                        inner.pop_waiter(target, id);
                        inner.acquire(player, target);
                        return Ok(inner.render(player));
                    }
                    // The cell was taken again (a second-card flip does not
                    // queue); keep our place and wait for the next release.
                    signal = Some(inner.rearm_waiter(target, id));
                }
            }
        }
    }

    /// Resolve with a fresh view after the next board change at or after this
    /// call.
    ///
    /// Subscribing happens under the board lock, which marks the version at
    /// call entry as seen; any later bump, even one racing with the call,
    /// resolves `changed()`. Many concurrent watchers all resolve on a
    /// single change.
    pub async fn watch(&self, player: &PlayerId) -> String {
        let mut rx = {
            let inner = self.inner.lock().await;
            inner.version_tx.subscribe()
        };
        // Err means the sender is gone, which cannot outlive `&self`.
        let _ = rx.changed().await;
        self.look(player).await
    }

    /// Substitute card values board-wide without touching face or control
    /// state.
    ///
    /// For each value present at call entry, all cells carrying it update
    /// inside one per-value critical region: no observer sees a value half
    /// replaced. Regions on distinct values interleave freely with each other
    /// and with flips.
    pub async fn map_cards<F>(&self, player: &PlayerId, transform: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let values: Vec<String> = {
            let inner = self.inner.lock().await;
            let mut present = BTreeSet::new();
            for cell in &inner.cells {
                if let Some(card) = &cell.card {
                    present.insert(card.clone());
                }
            }
            present.into_iter().collect()
        };

        for value in values {
            let replacement = transform(&value);
            let region = {
                let mut regions = self.regions.lock().await;
                regions
                    .entry(value.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            };
            {
                let _guard = region.lock().await;
                let mut inner = self.inner.lock().await;
                let mut changed = false;
                for cell in &mut inner.cells {
                    if cell.card.as_deref() == Some(value.as_str()) {
                        cell.card = Some(replacement.clone());
                        changed = true;
                    }
                }
                if changed && replacement != value {
                    debug!("mapped card value {value:?} -> {replacement:?}");
                    inner.bump();
                }
            }
            let mut regions = self.regions.lock().await;
            if let Some(entry) = regions.get(&value) {
                // Two references: the registry's and ours. Nobody is waiting.
                if Arc::strong_count(entry) <= 2 {
                    regions.remove(&value);
                }
            }
        }

        self.look(player).await
    }
}

impl BoardInner {
    fn bump(&mut self) {
        self.version += 1;
        self.version_tx.send_replace(self.version);
    }

    fn ensure_player(&mut self, player: &PlayerId) {
        self.players.entry(player.clone()).or_default();
    }

    fn single_controlled(&self, player: &PlayerId) -> Option<usize> {
        self.players
            .get(player)
            .filter(|book| book.controlled.len() == 1)
            .map(|book| book.controlled[0])
    }

    /// Rules 3-A and 3-B, run at the top of every first-card attempt.
    fn turn_cleanup(&mut self, player: &PlayerId) {
        let Some(book) = self.players.get_mut(player) else {
            return;
        };
        if let Some((i, j)) = book.pending_matched.take() {
            book.controlled.clear();
            for idx in [i, j] {
                let cell = &mut self.cells[idx];
                cell.card = None;
                cell.face_up = false;
                cell.controller = None;
            }
            debug!("{player} matched pair removed: cells {i} and {j}");
            // Anyone parked on the removed cells must observe no-card.
            self.signal_head(i);
            self.signal_head(j);
            self.bump();
        } else {
            let revealed: Vec<usize> = book.last_revealed.drain().collect();
            let mut changed = false;
            for idx in revealed {
                let cell = &mut self.cells[idx];
                if cell.card.is_some() && cell.face_up && cell.controller.is_none() {
                    cell.face_up = false;
                    changed = true;
                }
            }
            if changed {
                self.bump();
            }
        }
    }

    /// Rules 2-A through 2-E. Never suspends.
    fn flip_second(
        &mut self,
        player: &PlayerId,
        first: usize,
        target: usize,
    ) -> Result<(), FlipError> {
        let cell = &self.cells[target];
        if cell.card.is_none() {
            self.abandon_first(player, first);
            self.bump();
            return Err(FlipError::NoCard);
        }
        if cell.face_up && cell.controller.is_some() {
            self.abandon_first(player, first);
            self.bump();
            return Err(FlipError::SecondControlled);
        }

        // 2-C: the target is face down, or face up and unowned.
        self.cells[target].face_up = true;
        if self.cells[first].card == self.cells[target].card {
            // 2-D: a match. Hold both until the next turn removes them.
            self.cells[target].controller = Some(player.clone());
            if let Some(book) = self.players.get_mut(player) {
                book.controlled.push(target);
                book.pending_matched = Some((first, target));
            }
            debug!("{player} matched cells {first} and {target}");
        } else {
            // 2-E: a mismatch. Both stay face up for everyone to see.
            self.cells[first].controller = None;
            if let Some(book) = self.players.get_mut(player) {
                book.controlled.clear();
                book.last_revealed.insert(first);
                book.last_revealed.insert(target);
            }
            self.signal_head(first);
        }
        self.bump();
        Ok(())
    }

    /// Release the held first card after a failed second-card attempt.
    fn abandon_first(&mut self, player: &PlayerId, first: usize) {
        self.cells[first].controller = None;
        if let Some(book) = self.players.get_mut(player) {
            book.controlled.clear();
            book.last_revealed.insert(first);
        }
        self.signal_head(first);
    }

    fn acquire(&mut self, player: &PlayerId, idx: usize) {
        let cell = &mut self.cells[idx];
        cell.face_up = true;
        cell.controller = Some(player.clone());
        if let Some(book) = self.players.get_mut(player) {
            book.controlled.push(idx);
        }
        debug!("{player} took cell {idx}");
        self.bump();
    }

    /// Wake the first live waiter on a cell, skipping abandoned entries.
    fn signal_head(&mut self, idx: usize) {
        let cell = &mut self.cells[idx];
        loop {
            cell.prune_dead();
            let Some(head) = cell.waiters.front_mut() else {
                break;
            };
            let Some(tx) = head.tx.take() else {
                // Already signaled; it will act when it wakes.
                break;
            };
            if tx.send(()).is_ok() {
                break;
            }
            cell.waiters.pop_front();
        }
    }

    fn enqueue_waiter(&mut self, idx: usize) -> (u64, Arc<()>, oneshot::Receiver<()>) {
        let id = self.next_waiter;
        self.next_waiter += 1;
        let guard = Arc::new(());
        let (tx, rx) = oneshot::channel();
        self.cells[idx].waiters.push_back(Waiter {
            id,
            alive: Arc::downgrade(&guard),
            tx: Some(tx),
        });
        (id, guard, rx)
    }

    fn rearm_waiter(&mut self, idx: usize, id: u64) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if let Some(waiter) = self.cells[idx].waiters.iter_mut().find(|w| w.id == id) {
            waiter.tx = Some(tx);
        }
        rx
    }

    fn pop_waiter(&mut self, idx: usize, id: u64) {
        self.cells[idx].waiters.retain(|w| w.id != id);
    }

    fn render(&self, player: &PlayerId) -> String {
        let mut out = String::with_capacity(self.cells.len() * 6 + 8);
        out.push_str(&format!("{}x{}\n", self.height, self.width));
        for cell in &self.cells {
            match (&cell.card, cell.face_up, &cell.controller) {
                (None, _, _) => out.push_str("none\n"),
                (Some(_), false, _) => out.push_str("down\n"),
                (Some(card), true, Some(owner)) if owner == player => {
                    out.push_str("my ");
                    out.push_str(card);
                    out.push('\n');
                }
                (Some(card), true, _) => {
                    out.push_str("up ");
                    out.push_str(card);
                    out.push('\n');
                }
            }
        }
        out
    }
}
