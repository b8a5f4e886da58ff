//! Engine sizing.
//!
//! - Packet store capacity (how much recent history is retained)
//! - Per-subscriber delivery queue depth for the broadcast hub

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Bounded packet store configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StoreConfig {
    /// Maximum number of packet records retained; the oldest is evicted first.
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    1000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Broadcast hub configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct HubConfig {
    /// Records buffered per subscriber before it is considered stalled and
    /// disconnected.
    #[serde(default = "default_subscriber_queue")]
    #[validate(range(min = 1, max = 65536))]
    pub subscriber_queue: usize,
}

fn default_subscriber_queue() -> usize {
    1024
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_queue: default_subscriber_queue(),
        }
    }
}
