//! Crafting and transmission of IPv4 UDP datagrams with arbitrary (spoofed)
//! source addresses and ports, using a raw socket with header inclusion.
//!
//! Headers follow [RFC 791] and [RFC 768]; both checksums use the Internet
//! checksum of [RFC 1071].
//!
//! [RFC 791]: https://www.rfc-editor.org/rfc/rfc791
//! [RFC 768]: https://www.rfc-editor.org/rfc/rfc768
//! [RFC 1071]: https://www.rfc-editor.org/rfc/rfc1071

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

#[cfg(not(unix))]
compile_error!("This crate is only compatible with Unix systems that support raw IPv4 sockets.");

pub mod addr;
pub mod conn;
pub mod error;
pub mod logger;
pub mod net;
pub mod raw;

pub use conn::{Config, Sent, SpoofedConn};
pub use error::{AddrError, Error, HeaderError, ParseError, Result};
pub use net::TotalLenOrder;
