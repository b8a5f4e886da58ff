//! Live capture through libpcap.
//!
//! The capture handle is opened with a read timeout so that `next_frame`
//! returns periodically even on an idle interface; the engine relies on this
//! to observe its stop flag between frames.
use std::net::IpAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use pcap::{Active, Capture, Device, Linktype};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::frame::{Frame, LinkKind};
use crate::source::{FrameSource, SourceOpener};

/// Options applied to every capture handle opened by [`PcapOpener`].
#[derive(Debug, Clone)]
pub struct PcapSettings {
    pub promiscuous: bool,
    /// Snapshot length in bytes.
    pub snaplen: i32,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: i32,
    /// Optional BPF expression applied in the kernel.
    pub filter: Option<String>,
}

impl Default for PcapSettings {
    fn default() -> Self {
        Self {
            promiscuous: true,
            snaplen: 65535,
            read_timeout_ms: 250,
            filter: None,
        }
    }
}

/// Opens live pcap captures.
#[derive(Debug, Clone, Default)]
pub struct PcapOpener {
    settings: PcapSettings,
}

impl PcapOpener {
    pub fn new(settings: PcapSettings) -> Self {
        Self { settings }
    }

    fn find_device(interface: Option<&str>) -> Result<Device, CaptureError> {
        match interface {
            Some(name) => Device::list()
                .map_err(CaptureError::Lookup)?
                .into_iter()
                .find(|d| d.name == name)
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string())),
            None => Device::lookup()
                .map_err(CaptureError::Lookup)?
                .ok_or(CaptureError::NoDefaultDevice),
        }
    }
}

impl SourceOpener for PcapOpener {
    fn open(&self, interface: Option<&str>) -> Result<Box<dyn FrameSource>, CaptureError> {
        let device = Self::find_device(interface)?;
        let name = device.name.clone();
        let open_err = |source| CaptureError::Open {
            interface: name.clone(),
            source,
        };

        let mut capture = Capture::from_device(device)
            .map_err(open_err)?
            .promisc(self.settings.promiscuous)
            .snaplen(self.settings.snaplen)
            .timeout(self.settings.read_timeout_ms)
            .immediate_mode(true)
            .open()
            .map_err(open_err)?;

        if let Some(filter) = &self.settings.filter {
            capture
                .filter(filter, true)
                .map_err(|source| CaptureError::Filter {
                    filter: filter.clone(),
                    source,
                })?;
        }

        let linktype = capture.get_datalink();
        let link = link_kind(linktype);
        info!(interface = %name, ?linktype, "Opened live capture");

        Ok(Box::new(PcapSource {
            capture,
            link,
            interface: name,
        }))
    }
}

/// Maps a pcap datalink type onto the framings the classifier understands.
fn link_kind(linktype: Linktype) -> LinkKind {
    if linktype == Linktype::RAW || linktype == Linktype::IPV4 || linktype == Linktype::IPV6 {
        LinkKind::RawIp
    } else if linktype == Linktype::LINUX_SLL {
        LinkKind::LinuxSll
    } else {
        if linktype != Linktype::ETHERNET {
            warn!(?linktype, "Unsupported datalink, decoding frames as Ethernet");
        }
        LinkKind::Ethernet
    }
}

struct PcapSource {
    capture: Capture<Active>,
    link: LinkKind,
    interface: String,
}

impl FrameSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let captured_at =
                    DateTime::<Utc>::from_timestamp(ts.tv_sec as i64, ts.tv_usec as u32 * 1000)
                        .unwrap_or_else(Utc::now);
                Ok(Some(Frame {
                    data: Bytes::copy_from_slice(packet.data),
                    link: self.link,
                    captured_at,
                }))
            }
            // No packet received in this timeout window.
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(pcap::Error::NoMorePackets) => {
                debug!(interface = %self.interface, "Capture exhausted");
                Err(CaptureError::Closed)
            }
            Err(e) => Err(CaptureError::Read(e)),
        }
    }
}

/// A capture device as reported by libpcap.
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub description: Option<String>,
    pub addresses: Vec<IpAddr>,
}

/// Lists the devices libpcap can capture on.
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>, CaptureError> {
    let devices = Device::list().map_err(CaptureError::Lookup)?;
    Ok(devices
        .into_iter()
        .map(|d| InterfaceInfo {
            name: d.name,
            description: d.desc,
            addresses: d.addresses.into_iter().map(|a| a.addr).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_linktypes_map_to_raw_ip() {
        assert_eq!(link_kind(Linktype::RAW), LinkKind::RawIp);
        assert_eq!(link_kind(Linktype::IPV4), LinkKind::RawIp);
        assert_eq!(link_kind(Linktype::LINUX_SLL), LinkKind::LinuxSll);
        assert_eq!(link_kind(Linktype::ETHERNET), LinkKind::Ethernet);
    }

    #[test]
    fn unknown_device_is_reported() {
        let opener = PcapOpener::default();
        match opener.open(Some("nosa-does-not-exist0")) {
            Err(CaptureError::DeviceNotFound(name)) => assert_eq!(name, "nosa-does-not-exist0"),
            // Environments without capture permissions fail the device lookup itself.
            Err(CaptureError::Lookup(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a non-existent device"),
        }
    }
}
