//! # nosa-core
//!
//! Capture-and-distribution engine: frames are classified into packet
//! records, kept in a bounded store and broadcast to live subscribers.
//!
//! ### Key Submodules:
//! - `classifier`: frame → [`PacketRecord`] via `etherparse`
//! - `store`: fixed-capacity FIFO history with snapshots
//! - `hub`: per-subscriber bounded queues with eviction on failure
//! - `controller`: stopped/running/paused state machine and capture thread
//! - `engine`: owns all of the above

pub mod classifier;
pub mod controller;
pub mod engine;
pub mod error;
pub mod hub;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod store;

pub mod prelude {
    pub use crate::controller::CaptureState;
    pub use crate::engine::{CaptureStatus, Engine, EngineSettings};
    pub use crate::error::TransitionError;
    pub use crate::hub::{SubscriberId, Subscription};
    pub use crate::query::{PacketFilter, QueryResult};
    pub use crate::record::{PacketRecord, Protocol};
}

pub use classifier::classify;
pub use engine::{CaptureStatus, Engine, EngineSettings};
pub use error::TransitionError;
pub use record::{PacketRecord, Protocol};
