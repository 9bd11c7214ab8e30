//! Follower intake: store what the leader sends, acknowledge, nothing else.

use std::sync::Arc;

use log::debug;

use super::store::Store;

/// One follower replica. No quorum logic, no fanout; concurrent replications
/// land in whatever order the scheduler runs them.
pub struct Follower {
    id: String,
    store: Arc<Store>,
}

impl Follower {
    pub fn new(id: impl Into<String>, store: Arc<Store>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Accept one replicated pair from the leader.
    pub async fn replicate(&self, key: String, value: String) {
        self.store.put(key.clone(), value).await;
        debug!(
            "follower {} replicated {key:?} (store size {})",
            self.id,
            self.store.len().await
        );
    }

    pub async fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replicate_then_read() {
        let follower = Follower::new("f1", Arc::new(Store::new()));
        assert_eq!(follower.read("k").await, None);
        follower.replicate("k".into(), "v".into()).await;
        assert_eq!(follower.read("k").await, Some("v".into()));
    }
}
