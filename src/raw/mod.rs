//! Raw IPv4 sockets let user space hand the kernel a complete IP packet,
//! header included, instead of only the transport payload. The kernel skips
//! building its own IP header, so every field, the source address among them,
//! is whatever the caller wrote.

mod socket;
pub use socket::{RawSocket, Transmit};
