use thiserror::Error;

/// Terminal capture failures. Any of these ends the current capture loop.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture device '{0}' not found")]
    DeviceNotFound(String),

    #[error("No default capture device available")]
    NoDefaultDevice,

    #[error("Failed to enumerate capture devices: {0}")]
    Lookup(#[source] pcap::Error),

    #[error("Failed to open capture on '{interface}': {source}")]
    Open {
        interface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("Invalid capture filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: pcap::Error,
    },

    #[error("Capture read failed: {0}")]
    Read(#[source] pcap::Error),

    #[error("Capture source closed")]
    Closed,
}
