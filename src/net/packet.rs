//! Assembly of complete IPv4/UDP datagrams ready for a raw socket.

use std::net::SocketAddrV4;

use crate::net::headers::{Ipv4Header, UdpHeader};
use crate::{HeaderError, Result};

/// Length of the IPv4 and UDP headers combined, in bytes.
pub const HEADERS_LEN: usize = Ipv4Header::HEADER_LEN as usize + UdpHeader::HEADER_LEN as usize;

/// Largest payload that fits in a single IPv4/UDP datagram, in bytes.
pub const MAX_PAYLOAD_LEN: usize = Ipv4Header::MAX_TOTAL_LEN as usize - HEADERS_LEN;

/// Byte order the raw-socket layer expects for the IPv4 `total length` field.
///
/// Darwin raw sockets expect the `total length` field of a header-included
/// packet in host byte order rather than network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalLenOrder {
    /// `total length` is transmitted in network byte order.
    Network,
    /// The two bytes of `total length` are swapped after serialization.
    Swapped,
}

impl TotalLenOrder {
    /// Returns the order expected by the target this crate is compiled for.
    ///
    /// Resolved at compile time; assembly itself never inspects the host.
    pub const fn native() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            TotalLenOrder::Swapped
        } else {
            TotalLenOrder::Network
        }
    }
}

impl Default for TotalLenOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// A serialized IPv4/UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
    truncated: usize,
}

impl Packet {
    /// Returns the wire bytes of the datagram.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the packet, returning its wire bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the length of the datagram in bytes, headers included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`, a datagram carries at least its headers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the number of payload bytes dropped to fit the datagram.
    pub fn truncated(&self) -> usize {
        self.truncated
    }
}

/// Builds a datagram carrying `payload` from the spoofed `src` to `dst`.
///
/// Payloads longer than [MAX_PAYLOAD_LEN] are truncated to fit; the number of
/// dropped bytes is reported by [Packet::truncated]. Both checksums are
/// computed, the UDP one against the finalized IPv4 header. With
/// [TotalLenOrder::Swapped], bytes 2 and 3 of the serialized packet are
/// exchanged.
///
/// # Errors
///
/// Returns an error if the datagram exceeds the maximum IPv4 total length, or
/// if a header fails to encode.
pub fn assemble(
    src: SocketAddrV4,
    dst: SocketAddrV4,
    payload: &[u8],
    order: TotalLenOrder,
) -> Result<Packet> {
    let (payload, truncated) = match payload.len().checked_sub(MAX_PAYLOAD_LEN) {
        Some(excess) if excess > 0 => (&payload[..MAX_PAYLOAD_LEN], excess),
        _ => (payload, 0),
    };

    let udp_len = UdpHeader::HEADER_LEN as usize + payload.len();
    let total_len = Ipv4Header::HEADER_LEN as usize + udp_len;

    if total_len > Ipv4Header::MAX_TOTAL_LEN as usize {
        return Err(HeaderError::PacketTooLarge {
            provided: total_len,
            maximum: Ipv4Header::MAX_TOTAL_LEN,
        }
        .into());
    }

    let mut ip_header = Ipv4Header::new(*src.ip(), *dst.ip(), udp_len)?;
    ip_header.update_checksum();

    let mut udp_header = UdpHeader::new(src.port(), dst.port(), payload.len())?;
    udp_header.update_checksum(&ip_header, payload);

    let mut bytes = Vec::with_capacity(total_len);
    ip_header.write(&mut bytes)?;
    udp_header.write(&mut bytes)?;
    bytes.extend_from_slice(payload);

    if order == TotalLenOrder::Swapped {
        bytes.swap(2, 3);
    }

    Ok(Packet { bytes, truncated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::checksum::checksum;
    use crate::net::headers::Protocol;
    use std::net::Ipv4Addr;

    fn src() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 4000)
    }

    fn dst() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 9999)
    }

    #[test]
    fn assemble_ping_layout() {
        let packet = assemble(src(), dst(), b"ping", TotalLenOrder::Network).unwrap();
        let bytes = packet.as_bytes();

        assert_eq!(packet.len(), 32);
        assert_eq!(packet.truncated(), 0);

        assert_eq!(bytes[0], 0x45);
        assert_eq!(&bytes[2..4], &[0x00, 0x20]);
        assert_eq!(&bytes[4..6], &[0x12, 0x34]);
        assert_eq!(bytes[8], 64);
        assert_eq!(bytes[9], 17);
        assert_eq!(&bytes[12..16], &[0x0A, 0x00, 0x00, 0x01]);
        assert_eq!(&bytes[16..20], &[0xCB, 0x00, 0x71, 0x05]);

        let udp = &bytes[20..28];
        assert_eq!(&udp[0..2], &[0x0F, 0xA0]);
        assert_eq!(&udp[2..4], &[0x27, 0x0F]);
        assert_eq!(&udp[4..6], &[0x00, 0x0C]);

        assert_eq!(&bytes[28..], b"ping");
    }

    #[test]
    fn assemble_headers_decode() {
        let packet = assemble(src(), dst(), b"ping", TotalLenOrder::Network).unwrap();
        let bytes = packet.as_bytes();

        let ip = Ipv4Header::try_from(bytes).unwrap();
        let udp = UdpHeader::try_from(&bytes[ip.header_len()..]).unwrap();

        assert_eq!(ip.src(), *src().ip());
        assert_eq!(ip.dst(), *dst().ip());
        assert_eq!(ip.protocol(), Protocol::UDP);
        assert_eq!(ip.total_len(), 32);
        assert_eq!(ip.checksum(), ip.compute_checksum());

        assert_eq!(udp.src_port(), 4000);
        assert_eq!(udp.dst_port(), 9999);
        assert_eq!(udp.len(), 12);
        assert_eq!(udp.checksum(), udp.compute_checksum(&ip, b"ping"));
    }

    #[test]
    fn assemble_ip_checksum_verifies() {
        let packet = assemble(src(), dst(), b"ping", TotalLenOrder::Network).unwrap();

        assert_eq!(checksum(&packet.as_bytes()[..20]), 0xFFFF);
    }

    #[test]
    fn assemble_swapped_total_len() {
        let network = assemble(src(), dst(), b"ping", TotalLenOrder::Network).unwrap();
        let swapped = assemble(src(), dst(), b"ping", TotalLenOrder::Swapped).unwrap();

        assert_eq!(&swapped.as_bytes()[2..4], &[0x20, 0x00]);
        assert_eq!(&network.as_bytes()[..2], &swapped.as_bytes()[..2]);
        assert_eq!(&network.as_bytes()[4..], &swapped.as_bytes()[4..]);
    }

    #[test]
    fn assemble_empty_payload() {
        let packet = assemble(src(), dst(), b"", TotalLenOrder::Network).unwrap();

        assert_eq!(packet.len(), HEADERS_LEN);
        assert_eq!(&packet.as_bytes()[24..26], &[0x00, 0x08]);
    }

    #[test]
    fn assemble_max_payload_not_truncated() {
        let payload = vec![0xAB; MAX_PAYLOAD_LEN];
        let packet = assemble(src(), dst(), &payload, TotalLenOrder::Network).unwrap();

        assert_eq!(MAX_PAYLOAD_LEN, 65507);
        assert_eq!(packet.truncated(), 0);
        assert_eq!(packet.len(), 65535);
        assert_eq!(&packet.as_bytes()[2..4], &[0xFF, 0xFF]);
        assert_eq!(&packet.as_bytes()[HEADERS_LEN..], &payload[..]);
    }

    #[test]
    fn assemble_truncates_by_one_byte() {
        let mut payload = vec![0xAB; MAX_PAYLOAD_LEN];
        payload.push(0xCD);

        let packet = assemble(src(), dst(), &payload, TotalLenOrder::Network).unwrap();

        assert_eq!(packet.truncated(), 1);
        assert_eq!(packet.len(), 65535);
        assert_eq!(*packet.as_bytes().last().unwrap(), 0xAB);
        assert_eq!(&packet.as_bytes()[24..26], &[0xFF, 0xEB]);
    }

    #[test]
    fn assemble_oversized_never_too_large() {
        let payload = vec![0u8; 2 * u16::MAX as usize];
        let packet = assemble(src(), dst(), &payload, TotalLenOrder::Swapped).unwrap();

        assert_eq!(packet.len(), 65535);
        assert_eq!(packet.truncated(), payload.len() - MAX_PAYLOAD_LEN);
    }

    #[test]
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    fn total_len_order_native_swapped_on_darwin() {
        assert_eq!(TotalLenOrder::native(), TotalLenOrder::Swapped);
        assert_eq!(TotalLenOrder::default(), TotalLenOrder::Swapped);
    }

    #[test]
    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    fn total_len_order_native_network_elsewhere() {
        assert_eq!(TotalLenOrder::native(), TotalLenOrder::Network);
        assert_eq!(TotalLenOrder::default(), TotalLenOrder::Network);
    }
}
