//! Wire-level building blocks for spoofed UDP over IPv4.
//!
//! This module provides the Internet checksum, the IPv4 and UDP headers, and
//! the assembly of both into a single datagram.

pub mod checksum;
pub mod headers;
pub mod packet;

pub use checksum::{checksum, checksum_iter};
pub use headers::{Ipv4Header, Protocol, PseudoHeader, UdpHeader};
pub use packet::{MAX_PAYLOAD_LEN, Packet, TotalLenOrder, assemble};
