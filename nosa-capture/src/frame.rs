//! Raw frames as handed over by a capture source.
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Link-layer framing of a captured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Ethernet II.
    Ethernet,
    /// Bare IPv4/IPv6 packets without a link header (tun devices, `DLT_RAW`).
    RawIp,
    /// Linux cooked capture (`any` pseudo-device).
    LinuxSll,
}

/// A single captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Captured bytes, starting at the link header.
    pub data: Bytes,
    pub link: LinkKind,
    /// Capture timestamp as reported by the source.
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Creates an Ethernet frame stamped with the current time.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_link(data, LinkKind::Ethernet)
    }

    pub fn with_link(data: impl Into<Bytes>, link: LinkKind) -> Self {
        Frame {
            data: data.into(),
            link,
            captured_at: Utc::now(),
        }
    }

    /// Number of bytes actually captured.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_defaults_to_ethernet() {
        let frame = Frame::new(vec![0u8; 60]);
        assert_eq!(frame.link, LinkKind::Ethernet);
        assert_eq!(frame.len(), 60);
    }

    #[test]
    fn empty_frame() {
        let frame = Frame::with_link(Vec::new(), LinkKind::RawIp);
        assert!(frame.is_empty());
    }
}
