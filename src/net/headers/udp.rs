use std::io;
use std::net::Ipv4Addr;

use crate::net::checksum::checksum_iter;
use crate::net::headers::Ipv4Header;
use crate::{HeaderError, ParseError, Result};

/// User Datagram Header.
///
/// RFC 768
///
/// ```text
///  0      7 8     15 16    23 24    31
/// +--------+--------+--------+--------+
/// |     Source      |   Destination   |
/// |      Port       |      Port       |
/// +--------+--------+--------+--------+
/// |                 |                 |
/// |     Length      |    Checksum     |
/// +--------+--------+--------+--------+
/// |
/// |          data octets ...
/// +---------------- ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    /// Port of the sending process.
    src_port: u16,
    /// Port of the destination process.
    dst_port: u16,
    /// Length in octets of this user datagram including this header and the
    /// data.
    length: u16,
    /// Checksum over the pseudo header, the UDP header, and the data.
    checksum: u16,
}

impl UdpHeader {
    /// Length of a UDP header in bytes.
    pub const HEADER_LEN: u16 = 8;

    /// Maximum payload length representable in the `length` field.
    pub const MAX_PAYLOAD_LEN: u16 = u16::MAX - Self::HEADER_LEN;

    /// Creates a new UDP header for a payload of `payload_len` bytes.
    ///
    /// The checksum is left zeroed, see [UdpHeader::update_checksum].
    ///
    /// # Errors
    ///
    /// Returns an error if the `payload_len` exceeds
    /// [UdpHeader::MAX_PAYLOAD_LEN].
    pub fn new(src_port: u16, dst_port: u16, payload_len: usize) -> Result<Self> {
        if payload_len > Self::MAX_PAYLOAD_LEN as usize {
            return Err(HeaderError::PacketTooLarge {
                provided: Self::HEADER_LEN as usize + payload_len,
                maximum: u16::MAX,
            }
            .into());
        }

        Ok(Self {
            src_port,
            dst_port,
            length: Self::HEADER_LEN + payload_len as u16,
            checksum: 0,
        })
    }

    /// Returns the `source port` field of the UDP header.
    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    /// Returns the `destination port` field of the UDP header.
    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    /// Returns the `length` field of the UDP header.
    pub fn len(&self) -> u16 {
        self.length
    }

    /// Returns `true` if the datagram carries no payload.
    pub fn is_empty(&self) -> bool {
        self.length <= Self::HEADER_LEN
    }

    /// Returns the `checksum` field of the UDP header.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Overwrites the `checksum` field of the UDP header.
    pub fn set_checksum(&mut self, checksum: u16) {
        self.checksum = checksum;
    }

    /// Computes the checksum for the UDP header.
    ///
    /// Checksum is the 16-bit one's complement of the one's complement sum of
    /// a pseudo header of information from the IP header, the UDP header, and
    /// the data, padded with zero octets at the end (if necessary) to make a
    /// multiple of two octets. For purposes of computing the checksum, the
    /// value of the checksum field is zero.
    pub fn compute_checksum(&self, ip_header: &Ipv4Header, payload: &[u8]) -> u16 {
        let mut udp_header = *self;

        udp_header.checksum = 0;

        let pseudo_header = PseudoHeader::new(ip_header, udp_header.length).to_be_bytes();
        let udp_header_bytes = udp_header.to_be_bytes();

        checksum_iter(
            pseudo_header
                .iter()
                .chain(udp_header_bytes.iter())
                .chain(payload.iter())
                .copied(),
        )
    }

    /// Computes the checksum against the finalized `ip_header` and `payload`
    /// and stores it in the `checksum` field.
    pub fn update_checksum(&mut self, ip_header: &Ipv4Header, payload: &[u8]) {
        self.checksum = self.compute_checksum(ip_header, payload);
    }

    /// Returns the memory representation of the UDP header as a byte array in
    /// big-endian (network) byte order.
    pub fn to_be_bytes(&self) -> [u8; Self::HEADER_LEN as usize] {
        let mut raw_header = [0u8; Self::HEADER_LEN as usize];

        raw_header[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        raw_header[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        raw_header[4..6].copy_from_slice(&self.length.to_be_bytes());
        raw_header[6..8].copy_from_slice(&self.checksum.to_be_bytes());

        raw_header
    }

    /// Writes the UDP header to the given output stream.
    ///
    /// # Notes
    ///
    /// The checksum is NOT automatically computed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output stream fails.
    pub fn write<T: io::Write>(&self, output: &mut T) -> Result<()> {
        output
            .write_all(&self.to_be_bytes())
            .map_err(|source| HeaderError::Encode {
                header: "UDP",
                source,
            })?;

        Ok(())
    }
}

impl TryFrom<&[u8]> for UdpHeader {
    type Error = crate::Error;

    fn try_from(header_raw: &[u8]) -> Result<Self> {
        if header_raw.len() < Self::HEADER_LEN as usize {
            return Err(ParseError::InvalidBufferLength {
                provided: header_raw.len(),
                minimum: Self::HEADER_LEN,
            }
            .into());
        }

        let length = u16::from_be_bytes([header_raw[4], header_raw[5]]);

        if length < Self::HEADER_LEN {
            return Err(ParseError::InvalidTotalLength {
                provided: length,
                minimum: Self::HEADER_LEN,
            }
            .into());
        }

        Ok(Self {
            src_port: u16::from_be_bytes([header_raw[0], header_raw[1]]),
            dst_port: u16::from_be_bytes([header_raw[2], header_raw[3]]),
            length,
            checksum: u16::from_be_bytes([header_raw[6], header_raw[7]]),
        })
    }
}

/// Pseudo header conceptually prefixed to the UDP header for checksum
/// computation. Never transmitted.
///
/// ```text
///  0      7 8     15 16    23 24    31
/// +--------+--------+--------+--------+
/// |          source address           |
/// +--------+--------+--------+--------+
/// |        destination address        |
/// +--------+--------+--------+--------+
/// |  zero  |protocol|   UDP length    |
/// +--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    protocol: u8,
    udp_len: u16,
}

impl PseudoHeader {
    /// Length of the pseudo header in bytes.
    pub const LEN: usize = 12;

    /// Builds the pseudo header from the finalized IP header and the UDP
    /// `length` field.
    pub fn new(ip_header: &Ipv4Header, udp_len: u16) -> Self {
        Self {
            src_addr: ip_header.src(),
            dst_addr: ip_header.dst(),
            protocol: ip_header.protocol().into(),
            udp_len,
        }
    }

    /// Returns the pseudo header as bytes in network byte order.
    pub fn to_be_bytes(&self) -> [u8; Self::LEN] {
        let mut raw = [0u8; Self::LEN];

        raw[0..4].copy_from_slice(&self.src_addr.octets());
        raw[4..8].copy_from_slice(&self.dst_addr.octets());
        raw[8] = 0;
        raw[9] = self.protocol;
        raw[10..12].copy_from_slice(&self.udp_len.to_be_bytes());

        raw
    }
}
