//! Extracts the TCP fields this agent cares about from a captured link-layer
//! frame.

use std::net::IpAddr;

use etherparse::{NetHeaders, PacketHeaders, TransportHeader};
use portmesh_core::Pkt;

/// One observed TCP segment, already reduced to what fusion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpObservation {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub dport: u16,
    pub pkt: Pkt,
}

/// Parse an Ethernet frame and pull out its TCP/IPv4 fields, if any.
///
/// Returns `None` for anything that isn't a TCP-over-IPv4 segment; the
/// monitor loop silently ignores everything else (ARP, IPv6, UDP, ...).
pub fn parse_tcp_segment(frame: &[u8]) -> Option<TcpObservation> {
    let headers = PacketHeaders::from_ethernet_slice(frame).ok()?;

    let NetHeaders::Ipv4(ipv4, _) = headers.net? else {
        return None;
    };
    let TransportHeader::Tcp(tcp) = headers.transport? else {
        return None;
    };

    let src = IpAddr::from(ipv4.source);
    let dst = IpAddr::from(ipv4.destination);
    let flags = flags_string(&tcp);
    let seq = tcp.sequence_number;

    Some(TcpObservation {
        src,
        dst,
        dport: tcp.destination_port,
        pkt: Pkt::new(flags).with_seq(seq),
    })
}

fn flags_string(tcp: &etherparse::TcpHeaderSlice<'_>) -> String {
    let mut flags = String::new();
    if tcp.syn() {
        flags.push('S');
    }
    if tcp.ack() {
        flags.push('A');
    }
    if tcp.fin() {
        flags.push('F');
    }
    if tcp.rst() {
        flags.push('R');
    }
    if tcp.psh() {
        flags.push('P');
    }
    if tcp.urg() {
        flags.push('U');
    }
    flags
}
