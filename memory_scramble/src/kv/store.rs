//! Per-replica key/value map.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, String>,
    /// Ordering hint only; never consulted for correctness.
    last_update: Option<Instant>,
}

/// One replica's local store. Admits concurrent reads and writes; last
/// writer wins per key with no cross-replica ordering promise.
#[derive(Default)]
pub struct Store {
    inner: RwLock<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, key: String, value: String) {
        let mut inner = self.inner.write().await;
        inner.entries.insert(key, value);
        inner.last_update = Some(Instant::now());
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.read().await.entries.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Snapshot of the whole map, for verification endpoints.
    pub async fn dump(&self) -> HashMap<String, String> {
        self.inner.read().await.entries.clone()
    }
}
