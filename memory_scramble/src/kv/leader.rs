//! Leader replicator: local apply, concurrent fanout, quorum gating.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use super::delay::DelayRange;
use super::store::Store;
use super::transport::{ReplicatePayload, ReplicationTransport};

/// Write failures surfaced to the client.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Fewer than W follower acknowledgements ever arrived. The leader's
    /// local state is not rolled back.
    #[error("write quorum not met: {confirmed} of {required} follower acknowledgements")]
    QuorumFailed { confirmed: usize, required: usize },
}

/// Diagnostics for a successful quorum write.
#[derive(Clone, Copy, Debug)]
pub struct WriteOutcome {
    /// Follower acknowledgements received when the call returned.
    pub confirmations: usize,
    pub latency_ms: f64,
}

/// The single writer. Fans each write out to every follower and returns once
/// `write_quorum` of them have acknowledged; the stragglers keep replicating
/// in the background and are never cancelled.
pub struct Leader {
    store: Arc<Store>,
    followers: Vec<String>,
    write_quorum: usize,
    delay: DelayRange,
    transport: Arc<dyn ReplicationTransport>,
}

impl Leader {
    pub fn new(
        store: Arc<Store>,
        followers: Vec<String>,
        write_quorum: usize,
        delay: DelayRange,
        transport: Arc<dyn ReplicationTransport>,
    ) -> Self {
        info!(
            "leader initialized with {} followers, write quorum {}, delay [{}, {}]ms",
            followers.len(),
            write_quorum,
            delay.min_ms,
            delay.max_ms
        );
        Self {
            store,
            followers,
            write_quorum,
            delay,
            transport,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn followers(&self) -> &[String] {
        &self.followers
    }

    pub fn write_quorum(&self) -> usize {
        self.write_quorum
    }

    /// Apply a write locally, replicate it to every follower, and return as
    /// soon as the quorum of follower acknowledgements is in.
    ///
    /// Each replication waits out one uniform random delay before contacting
    /// its follower. Failures past the quorum are logged, not surfaced.
    ///
    /// # Errors
    ///
    /// [`WriteError::QuorumFailed`] once all followers have answered and
    /// fewer than the quorum succeeded.
    pub async fn write(&self, key: String, value: String) -> Result<WriteOutcome, WriteError> {
        let start = Instant::now();
        self.store.put(key.clone(), value.clone()).await;

        let payload = ReplicatePayload { key, value };
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<bool>();
        for follower in self.followers.clone() {
            let transport = Arc::clone(&self.transport);
            let payload = payload.clone();
            let delay = self.delay;
            let ack_tx = ack_tx.clone();
            tokio::spawn(async move {
                delay.wait().await;
                let result = transport.replicate(&follower, &payload).await;
                match &result {
                    Ok(()) => debug!("replicated {:?} to {follower}", payload.key),
                    Err(e) => warn!("replication failed: {e}"),
                }
                let outcome = if result.is_ok() { "ok" } else { "err" };
                metrics::counter!(
                    "kv_replication_total",
                    "follower" => follower.clone(),
                    "outcome" => outcome
                )
                .increment(1);
                // The writer may have returned already; that is fine, the
                // replication itself is what mattered.
                let _ = ack_tx.send(result.is_ok());
            });
        }
        drop(ack_tx);

        if self.write_quorum == 0 {
            return Ok(WriteOutcome {
                confirmations: 0,
                latency_ms: elapsed_ms(start),
            });
        }

        let total = self.followers.len();
        let mut confirmed = 0;
        let mut answered = 0;
        while let Some(ok) = ack_rx.recv().await {
            answered += 1;
            if ok {
                confirmed += 1;
            }
            if confirmed >= self.write_quorum {
                let latency_ms = elapsed_ms(start);
                debug!(
                    "quorum {} met after {answered} of {total} answers, latency {latency_ms:.2}ms",
                    self.write_quorum
                );
                return Ok(WriteOutcome {
                    confirmations: confirmed,
                    latency_ms,
                });
            }
            if answered == total {
                break;
            }
        }

        warn!(
            "write quorum not met: {confirmed} confirmations, needed {}",
            self.write_quorum
        );
        Err(WriteError::QuorumFailed {
            confirmed,
            required: self.write_quorum,
        })
    }

    /// Local read; any replica may serve these.
    pub async fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).await
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
