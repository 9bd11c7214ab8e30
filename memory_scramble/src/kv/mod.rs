//! Quorum-replicated key/value store.
//!
//! A single-writer [`Leader`] applies each write locally, then fans it out to
//! N followers concurrently and reports success once W follower
//! acknowledgements have arrived. The remaining replications always run to
//! completion in the background; cancelling them would leave followers
//! permanently divergent. Reads are served locally by any replica.

pub mod delay;
pub mod follower;
pub mod leader;
pub mod store;
pub mod transport;

pub use delay::DelayRange;
pub use follower::Follower;
pub use leader::{Leader, WriteError, WriteOutcome};
pub use store::Store;
pub use transport::{HttpTransport, ReplicatePayload, ReplicationTransport, TransportError};
