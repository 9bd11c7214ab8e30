//! Replication transport seam.
//!
//! The leader talks to followers through [`ReplicationTransport`], so tests
//! can replicate in memory while the server replicates over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire payload for one replication request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReplicatePayload {
    pub key: String,
    pub value: String,
}

/// Per-replication failures. Logged by the leader; surfaced only when they
/// cost the quorum.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("follower {follower} unreachable: {reason}")]
    Unreachable { follower: String, reason: String },
    #[error("follower {follower} replied with status {status}")]
    BadStatus { follower: String, status: u16 },
}

#[async_trait]
pub trait ReplicationTransport: Send + Sync + 'static {
    /// Deliver one key/value pair to a follower and wait for its
    /// acknowledgement.
    async fn replicate(
        &self,
        follower: &str,
        payload: &ReplicatePayload,
    ) -> Result<(), TransportError>;
}

const REPLICATE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP transport: `POST {follower}/replicate` with a JSON body.
#[derive(Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplicationTransport for HttpTransport {
    async fn replicate(
        &self,
        follower: &str,
        payload: &ReplicatePayload,
    ) -> Result<(), TransportError> {
        let url = format!("{}/replicate", follower.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .timeout(REPLICATE_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                follower: follower.to_string(),
                reason: e.to_string(),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::BadStatus {
                follower: follower.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}
