//! Normalized packet records.
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol classification of a captured packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// Network layer present, no recognized transport.
    Ip,
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ip => "IP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
        }
    }

    /// Case-insensitive comparison against a protocol name.
    pub fn matches(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name.trim())
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified packet. Immutable once built by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "source_ip")]
    pub source: IpAddr,
    #[serde(rename = "destination_ip")]
    pub destination: IpAddr,
    pub protocol: Protocol,
    /// Length of the frame as captured, link header included.
    pub packet_size: usize,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub ttl: Option<u8>,
    /// Active TCP flags, e.g. `"SYN, ACK"`.
    pub flags: Option<String>,
}
