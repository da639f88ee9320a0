use std::io;
use std::net::Ipv4Addr;

use crate::net::checksum::checksum;
use crate::{HeaderError, ParseError, Result};

/// IPv4 Datagram Header.
///
/// # Note
///
/// IPv4 options are not supported, the IHL is always 5.
///
/// RFC 791 (3.1)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Version|  IHL  |Type of Service|          Total Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Identification        |Flags|      Fragment Offset    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Time to Live |    Protocol   |         Header Checksum       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Source Address                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Destination Address                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// The version field indicates the format of the internet header.
    ///
    /// Internet Header Length (IHL) is the length of the internet header in
    /// 32-bit words.
    version_ihl: u8,
    /// Type of service.
    tos: u8,
    /// Total length is the length of the datagram, measured in octets,
    /// including internet header and payload.
    total_len: u16,
    /// An identifying value assigned by the sender to aid in assembling the
    /// fragments of a datagram.
    id: u16,
    /// Control flags (reserved, DF, MF) and fragment offset, measured in units
    /// of 8 octets.
    flags_and_offset: u16,
    /// Indicates the maximum time the datagram is allowed to remain in the
    /// internet system.
    ttl: u8,
    /// Indicates the next level protocol used in the data portion of the
    /// internet datagram.
    protocol: Protocol,
    /// A checksum on the header only.
    header_checksum: u16,
    /// The source address.
    src_addr: [u8; 4],
    /// The destination address.
    dst_addr: [u8; 4],
}

impl Ipv4Header {
    /// Length of an IPv4 header without options, in bytes.
    pub const HEADER_LEN: u16 = 20;

    /// Maximum total length of an IPv4 datagram in bytes.
    pub const MAX_TOTAL_LEN: u16 = u16::MAX;

    /// Maximum payload length in bytes, accounting for the header length.
    pub const MAX_PAYLOAD_LEN: u16 = Self::MAX_TOTAL_LEN - Self::HEADER_LEN;

    /// Identification used for every crafted datagram.
    ///
    /// Many kernels overwrite a zero identification, so a fixed non-zero
    /// value is used instead.
    pub const DEFAULT_ID: u16 = 0x1234;

    /// Time to live used for every crafted datagram.
    pub const DEFAULT_TTL: u8 = 64;

    /// Creates a new IPv4 header carrying a UDP payload of `payload_len` bytes
    /// from `src` to `dst`.
    ///
    /// The header checksum is left zeroed, see [Ipv4Header::update_checksum].
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting total length exceeds
    /// [Ipv4Header::MAX_TOTAL_LEN].
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, payload_len: usize) -> Result<Self> {
        let mut header = Self {
            src_addr: src.octets(),
            dst_addr: dst.octets(),
            ..Default::default()
        };
        header.set_payload_len(payload_len)?;

        Ok(header)
    }

    /// Returns the `version` field of the IPv4 header.
    pub fn version(&self) -> u8 {
        // Stored in the higher 4 bits.
        self.version_ihl >> 4
    }

    /// Returns the `IHL` field of the IPv4 header, specified in 32-bit words.
    pub fn ihl(&self) -> u8 {
        // Stored in the lower 4 bits.
        self.version_ihl & 0xF
    }

    /// Returns the `type of service` field of the IPv4 header.
    pub fn tos(&self) -> u8 {
        self.tos
    }

    /// Returns the `total length` field of the IPv4 header.
    pub fn total_len(&self) -> u16 {
        self.total_len
    }

    /// Sets the `total length` field of the IPv4 header given a payload length.
    ///
    /// # Errors
    ///
    /// Returns an error if the `payload_len` exceeds
    /// [Ipv4Header::MAX_PAYLOAD_LEN].
    pub fn set_payload_len(&mut self, payload_len: usize) -> Result<()> {
        if payload_len > Self::MAX_PAYLOAD_LEN as usize {
            return Err(HeaderError::PacketTooLarge {
                provided: Self::HEADER_LEN as usize + payload_len,
                maximum: Self::MAX_TOTAL_LEN,
            }
            .into());
        }

        self.total_len = Self::HEADER_LEN + payload_len as u16;

        Ok(())
    }

    /// Returns the `identification` field of the IPv4 header.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Returns the raw `flags` and `fragment offset` fields of the IPv4
    /// header.
    pub fn flags_and_offset(&self) -> u16 {
        self.flags_and_offset
    }

    /// Returns the `time to live` field of the IPv4 header.
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// Returns the `protocol` field of the IPv4 header.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the `header checksum` field of the IPv4 header.
    pub fn checksum(&self) -> u16 {
        self.header_checksum
    }

    /// Overwrites the `header checksum` field of the IPv4 header.
    pub fn set_checksum(&mut self, checksum: u16) {
        self.header_checksum = checksum;
    }

    /// Returns the `source address` field of the IPv4 header.
    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src_addr)
    }

    /// Returns the `destination address` field of the IPv4 header.
    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst_addr)
    }

    /// Returns the length of the IPv4 header, not including the payload.
    pub fn header_len(&self) -> usize {
        Self::HEADER_LEN as usize
    }

    /// Returns the payload length indicated by the `total length` field.
    pub fn payload_len(&self) -> usize {
        self.total_len.saturating_sub(Self::HEADER_LEN) as usize
    }

    /// Computes the header checksum for the IPv4 header.
    ///
    /// The checksum field is the 16 bit one's complement of the one's
    /// complement sum of all 16 bit words in the header. For purposes of
    /// computing the checksum, the value of the checksum field is zero.
    pub fn compute_checksum(&self) -> u16 {
        let mut header = *self;

        header.header_checksum = 0;

        checksum(&header.to_be_bytes())
    }

    /// Computes the header checksum and stores it in the `header checksum`
    /// field.
    ///
    /// The kernel may overwrite this value for raw sockets with header
    /// inclusion enabled.
    pub fn update_checksum(&mut self) {
        self.header_checksum = self.compute_checksum();
    }

    /// Returns the memory representation of the IPv4 header as a byte array in
    /// big-endian (network) byte order.
    pub fn to_be_bytes(&self) -> [u8; Self::HEADER_LEN as usize] {
        let mut raw_header = [0u8; Self::HEADER_LEN as usize];

        raw_header[0] = self.version_ihl;
        raw_header[1] = self.tos;
        raw_header[2..4].copy_from_slice(&self.total_len.to_be_bytes());
        raw_header[4..6].copy_from_slice(&self.id.to_be_bytes());
        raw_header[6..8].copy_from_slice(&self.flags_and_offset.to_be_bytes());
        raw_header[8] = self.ttl;
        raw_header[9] = self.protocol.into();
        raw_header[10..12].copy_from_slice(&self.header_checksum.to_be_bytes());
        raw_header[12..16].copy_from_slice(&self.src_addr);
        raw_header[16..20].copy_from_slice(&self.dst_addr);

        raw_header
    }

    /// Writes the IPv4 header to the given output stream.
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
                header: "IPv4",
                source,
            })?;

        Ok(())
    }
}

impl TryFrom<&[u8]> for Ipv4Header {
    type Error = crate::Error;

    fn try_from(header_raw: &[u8]) -> Result<Self> {
        if header_raw.len() < Self::HEADER_LEN as usize {
            return Err(ParseError::InvalidBufferLength {
                provided: header_raw.len(),
                minimum: Self::HEADER_LEN,
            }
            .into());
        }

        let version_ihl = header_raw[0];

        if (version_ihl >> 4) != 4 {
            return Err(ParseError::InvalidVersion {
                provided: version_ihl >> 4,
                expected: 4,
            }
            .into());
        }

        if (version_ihl & 0xF) != 5 {
            return Err(ParseError::InvalidIhl {
                provided: version_ihl & 0xF,
                expected: 5,
            }
            .into());
        }

        let total_len = u16::from_be_bytes([header_raw[2], header_raw[3]]);

        if total_len < Self::HEADER_LEN {
            return Err(ParseError::InvalidTotalLength {
                provided: total_len,
                minimum: Self::HEADER_LEN,
            }
            .into());
        }

        Ok(Self {
            version_ihl,
            tos: header_raw[1],
            total_len,
            id: u16::from_be_bytes([header_raw[4], header_raw[5]]),
            flags_and_offset: u16::from_be_bytes([header_raw[6], header_raw[7]]),
            ttl: header_raw[8],
            protocol: Protocol::try_from(header_raw[9])?,
            header_checksum: u16::from_be_bytes([header_raw[10], header_raw[11]]),
            src_addr: [
                header_raw[12],
                header_raw[13],
                header_raw[14],
                header_raw[15],
            ],
            dst_addr: [
                header_raw[16],
                header_raw[17],
                header_raw[18],
                header_raw[19],
            ],
        })
    }
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Self {
            version_ihl: 0b01000101, // Version = 4, IHL = 5
            tos: 0,
            total_len: Self::HEADER_LEN,
            id: Self::DEFAULT_ID,
            // May fragment, last fragment, offset 0.
            flags_and_offset: 0,
            ttl: Self::DEFAULT_TTL,
            protocol: Protocol::UDP,
            header_checksum: 0,
            src_addr: [0; 4],
            dst_addr: [0; 4],
        }
    }
}

/// Assigned Internet Protocol Numbers (RFC 1700) this crate can decode.
///
/// Headers built by this crate always carry [Protocol::UDP]. The ICMP and TCP
/// numbers are accepted when decoding so that captured or received headers
/// can be inspected instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    /// Internet Control Message
    ICMP = 1,
    /// Transmission Control
    TCP = 6,
    /// User Datagram
    UDP = 17,
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        proto as u8
    }
}

impl TryFrom<u8> for Protocol {
    type Error = ParseError;

    fn try_from(val: u8) -> std::result::Result<Self, Self::Error> {
        match val {
            1 => Ok(Protocol::ICMP),
            6 => Ok(Protocol::TCP),
            17 => Ok(Protocol::UDP),
            _ => Err(ParseError::InvalidProtocol(val)),
        }
    }
}
