//! # Frame classification
//!
//! Turns a raw captured frame into a [`PacketRecord`]. Frames without an
//! IPv4/IPv6 header (ARP, LLDP, ...) are rejected; this is the common case
//! on a busy segment and not an error.
//!
//! Decoding is lax: once the network header is intact, a truncated or
//! malformed transport header (short snaplen, bad TCP data offset) still
//! yields a record, classified as plain `IP`. Transport precedence is TCP,
//! then UDP, then ICMP.
use std::net::IpAddr;

use etherparse::{EtherType, LaxNetSlice, LaxSlicedPacket, TcpSlice, TransportSlice};
use nosa_capture::{Frame, LinkKind};
use tracing::trace;

use crate::record::{PacketRecord, Protocol};

/// Linux cooked capture (SLL) header length; the protocol field is last.
const SLL_HEADER_LEN: usize = 16;

/// Classifies a frame, returning `None` when it carries no network layer.
pub fn classify(frame: &Frame) -> Option<PacketRecord> {
    let sliced = slice(frame)?;

    let (source, destination, ttl): (IpAddr, IpAddr, u8) = match &sliced.net {
        Some(LaxNetSlice::Ipv4(ip)) => {
            let header = ip.header();
            (
                header.source_addr().into(),
                header.destination_addr().into(),
                header.ttl(),
            )
        }
        Some(LaxNetSlice::Ipv6(ip)) => {
            let header = ip.header();
            (
                header.source_addr().into(),
                header.destination_addr().into(),
                header.hop_limit(),
            )
        }
        _ => {
            trace!(len = frame.len(), "Dropping frame without network layer");
            return None;
        }
    };

    if let Some((err, layer)) = &sliced.stop_err {
        trace!(error = %err, ?layer, len = frame.len(), "Transport header undecodable");
    }

    let mut record = PacketRecord {
        timestamp: frame.captured_at,
        source,
        destination,
        protocol: Protocol::Ip,
        packet_size: frame.len(),
        source_port: None,
        destination_port: None,
        ttl: Some(ttl),
        flags: None,
    };

    match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            record.protocol = Protocol::Tcp;
            record.source_port = Some(tcp.source_port());
            record.destination_port = Some(tcp.destination_port());
            record.flags = tcp_flags(tcp);
        }
        Some(TransportSlice::Udp(udp)) => {
            record.protocol = Protocol::Udp;
            record.source_port = Some(udp.source_port());
            record.destination_port = Some(udp.destination_port());
        }
        Some(TransportSlice::Icmpv4(_)) | Some(TransportSlice::Icmpv6(_)) => {
            record.protocol = Protocol::Icmp;
        }
        _ => {}
    }

    Some(record)
}

fn slice(frame: &Frame) -> Option<LaxSlicedPacket<'_>> {
    let sliced = match frame.link {
        LinkKind::Ethernet => {
            LaxSlicedPacket::from_ethernet(&frame.data).map_err(|e| e.to_string())
        }
        LinkKind::RawIp => LaxSlicedPacket::from_ip(&frame.data).map_err(|e| e.to_string()),
        LinkKind::LinuxSll => match frame.data.get(..SLL_HEADER_LEN) {
            Some(header) => {
                let protocol = EtherType(u16::from_be_bytes([header[14], header[15]]));
                Ok(LaxSlicedPacket::from_ether_type(
                    protocol,
                    &frame.data[SLL_HEADER_LEN..],
                ))
            }
            None => Err(format!("frame shorter than {SLL_HEADER_LEN} byte SLL header")),
        },
    };

    match sliced {
        Ok(sliced) => Some(sliced),
        Err(e) => {
            trace!(error = %e, len = frame.len(), "Dropping undecodable frame");
            None
        }
    }
}

/// Joins the active flags in FIN, SYN, RST, PSH, ACK, URG order.
fn tcp_flags(tcp: &TcpSlice<'_>) -> Option<String> {
    let flags = [
        (tcp.fin(), "FIN"),
        (tcp.syn(), "SYN"),
        (tcp.rst(), "RST"),
        (tcp.psh(), "PSH"),
        (tcp.ack(), "ACK"),
        (tcp.urg(), "URG"),
    ];
    let active: Vec<&str> = flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();

    if active.is_empty() {
        None
    } else {
        Some(active.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const SRC_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
    const DST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

    #[test]
    fn tcp_syn_ack_is_classified_with_flags() {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([192, 168, 1, 10], [93, 184, 216, 34], 64)
            .tcp(51000, 443, 1, 64240)
            .syn()
            .ack(1);
        let mut data = Vec::with_capacity(builder.size(0));
        builder.write(&mut data, &[]).unwrap();
        let len = data.len();

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Tcp);
        assert_eq!(record.source, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(record.destination, IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));
        assert_eq!(record.source_port, Some(51000));
        assert_eq!(record.destination_port, Some(443));
        assert_eq!(record.ttl, Some(64));
        assert_eq!(record.flags.as_deref(), Some("SYN, ACK"));
        assert_eq!(record.packet_size, len);
    }

    #[test]
    fn tcp_without_flags_has_no_summary() {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 32)
            .tcp(1000, 2000, 7, 1024);
        let mut data = Vec::with_capacity(builder.size(4));
        builder.write(&mut data, b"data").unwrap();

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Tcp);
        assert_eq!(record.flags, None);
    }

    #[test]
    fn udp_carries_ports_but_no_flags() {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([10, 0, 0, 1], [10, 0, 0, 53], 17)
            .udp(40000, 53);
        let payload = [0u8; 12];
        let mut data = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut data, &payload).unwrap();

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Udp);
        assert_eq!(record.source_port, Some(40000));
        assert_eq!(record.destination_port, Some(53));
        assert_eq!(record.ttl, Some(17));
        assert_eq!(record.flags, None);
    }

    #[test]
    fn icmp_echo_has_no_ports() {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([10, 0, 0, 1], [8, 8, 8, 8], 128)
            .icmpv4_echo_request(1, 1);
        let mut data = Vec::with_capacity(builder.size(8));
        builder.write(&mut data, &[0u8; 8]).unwrap();

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Icmp);
        assert_eq!(record.source_port, None);
        assert_eq!(record.destination_port, None);
        assert_eq!(record.flags, None);
    }

    #[test]
    fn ipv6_udp_uses_hop_limit() {
        let src = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let dst = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv6(src.octets(), dst.octets(), 255)
            .udp(546, 547);
        let mut data = Vec::with_capacity(builder.size(4));
        builder.write(&mut data, &[1, 2, 3, 4]).unwrap();

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Udp);
        assert_eq!(record.source, IpAddr::V6(src));
        assert_eq!(record.destination, IpAddr::V6(dst));
        assert_eq!(record.ttl, Some(255));
    }

    #[test]
    fn raw_ip_frames_are_decoded_without_link_header() {
        let builder = PacketBuilder::ipv4([172, 16, 0, 1], [172, 16, 0, 2], 9).udp(1, 2);
        let mut data = Vec::with_capacity(builder.size(0));
        builder.write(&mut data, &[]).unwrap();

        let record = classify(&Frame::with_link(data, LinkKind::RawIp)).unwrap();
        assert_eq!(record.protocol, Protocol::Udp);
        assert_eq!(record.ttl, Some(9));
    }

    /// Ethernet + minimal IPv4 header carrying GRE (47), which has no
    /// transport decoder.
    fn gre_frame() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&DST_MAC);
        data.extend_from_slice(&SRC_MAC);
        data.extend_from_slice(&[0x08, 0x00]);
        data.extend_from_slice(&[
            0x45, 0x00, 0x00, 0x18, // version/ihl, tos, total length 24
            0x00, 0x00, 0x00, 0x00, // id, flags/fragment
            0x40, 0x2f, 0x00, 0x00, // ttl 64, proto 47, checksum
            10, 1, 1, 1, // source
            10, 2, 2, 2, // destination
        ]);
        data.extend_from_slice(&[0x00, 0x00, 0x08, 0x00]);
        data
    }

    #[test]
    fn ip_only_frame_is_plain_ip() {
        let record = classify(&Frame::new(gre_frame())).unwrap();
        assert_eq!(record.protocol, Protocol::Ip);
        assert_eq!(record.source, IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)));
        assert_eq!(record.destination, IpAddr::V4(Ipv4Addr::new(10, 2, 2, 2)));
        assert_eq!(record.ttl, Some(64));
        assert_eq!(record.source_port, None);
        assert_eq!(record.destination_port, None);
        assert_eq!(record.flags, None);
    }

    #[test]
    fn arp_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0xff; 6]);
        data.extend_from_slice(&SRC_MAC);
        data.extend_from_slice(&[0x08, 0x06]);
        data.extend_from_slice(&[
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, // htype, ptype, sizes, request
        ]);
        data.extend_from_slice(&SRC_MAC);
        data.extend_from_slice(&[10, 0, 0, 1]);
        data.extend_from_slice(&[0; 6]);
        data.extend_from_slice(&[10, 0, 0, 2]);

        assert!(classify(&Frame::new(data)).is_none());
    }

    fn tcp_with_payload(payload_len: usize) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([192, 168, 7, 1], [192, 168, 7, 2], 61)
            .tcp(33000, 8080, 1, 4096)
            .psh()
            .ack(1);
        let payload = vec![0xab; payload_len];
        let mut data = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut data, &payload).unwrap();
        data
    }

    #[test]
    fn snaplen_truncated_frame_keeps_its_network_fields() {
        let mut data = tcp_with_payload(200);
        data.truncate(64);

        let record = classify(&Frame::new(data)).unwrap();
        assert!(matches!(record.protocol, Protocol::Ip | Protocol::Tcp));
        assert_eq!(record.source, IpAddr::V4(Ipv4Addr::new(192, 168, 7, 1)));
        assert_eq!(record.destination, IpAddr::V4(Ipv4Addr::new(192, 168, 7, 2)));
        assert_eq!(record.ttl, Some(61));
        assert_eq!(record.packet_size, 64);
    }

    #[test]
    fn bad_tcp_data_offset_falls_back_to_ip() {
        let mut data = tcp_with_payload(16);
        // Ethernet (14) + IPv4 (20) + offset of the data-offset byte (12).
        data[14 + 20 + 12] = 2 << 4;

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Ip);
        assert_eq!(record.source, IpAddr::V4(Ipv4Addr::new(192, 168, 7, 1)));
        assert_eq!(record.source_port, None);
        assert_eq!(record.flags, None);
    }

    #[test]
    fn truncated_udp_header_falls_back_to_ip() {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(1000, 2000);
        let mut data = Vec::with_capacity(builder.size(0));
        builder.write(&mut data, &[]).unwrap();
        // Keep only 4 of the 8 UDP header bytes.
        data.truncate(14 + 20 + 4);

        let record = classify(&Frame::new(data)).unwrap();
        assert_eq!(record.protocol, Protocol::Ip);
        assert_eq!(record.destination, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn linux_cooked_frames_are_decoded() {
        let builder = PacketBuilder::ipv4([10, 9, 8, 7], [10, 9, 8, 6], 33).udp(123, 123);
        let mut ip = Vec::with_capacity(builder.size(0));
        builder.write(&mut ip, &[]).unwrap();

        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x06];
        data.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01, 0, 0]);
        data.extend_from_slice(&[0x08, 0x00]);
        data.extend_from_slice(&ip);
        let len = data.len();

        let record = classify(&Frame::with_link(data, LinkKind::LinuxSll)).unwrap();
        assert_eq!(record.protocol, Protocol::Udp);
        assert_eq!(record.source, IpAddr::V4(Ipv4Addr::new(10, 9, 8, 7)));
        assert_eq!(record.ttl, Some(33));
        assert_eq!(record.packet_size, len);

        assert!(classify(&Frame::with_link(vec![0u8; 10], LinkKind::LinuxSll)).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(classify(&Frame::new(vec![0u8; 3])).is_none());
        assert!(classify(&Frame::with_link(vec![0x45, 0x00], LinkKind::RawIp)).is_none());
    }

    #[test]
    fn timestamp_comes_from_the_frame() {
        let mut frame = Frame::new(gre_frame());
        frame.captured_at = chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let record = classify(&frame).unwrap();
        assert_eq!(record.timestamp, frame.captured_at);
    }
}
