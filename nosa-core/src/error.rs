use thiserror::Error;

/// Rejected lifecycle commands. The conflicts leave the state untouched.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Packet capture is already running")]
    AlreadyRunning,

    #[error("Packet capture is not running")]
    NotRunning,

    #[error("Failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl TransitionError {
    /// True for the idempotency guards, false for real faults.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}
