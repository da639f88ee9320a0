//! Construction, encoding, and decoding of IPv4 and UDP headers.

mod ipv4;
mod udp;

pub use ipv4::{Ipv4Header, Protocol};
pub use udp::{PseudoHeader, UdpHeader};
