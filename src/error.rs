//! Error types for crafting and transmitting spoofed UDP datagrams.

use std::{io, result};

/// Creates an [`io::Error`] with a custom message prefixed to the current
/// `errno` value.
macro_rules! errno {
    ($($arg:tt)+) => {{
        let errno = ::std::io::Error::last_os_error();
        let prefix = format!($($arg)+);
        let msg = format!("{prefix}: {errno}");
        ::std::io::Error::new(errno.kind(), msg)
    }};
}
pub(crate) use errno;

/// A convenience wrapper around `Result` for [crate::Error].
pub type Result<T> = result::Result<T, Error>;

/// Represents errors that can occur while sending spoofed UDP datagrams.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The destination endpoint could not be parsed or resolved.
    #[error(transparent)]
    AddrParse(#[from] AddrError),
    /// The raw socket could not be created or configured.
    #[error("failed to open raw socket: {0}")]
    SocketOpen(io::Error),
    /// An error occurred constructing or encoding an IPv4 or UDP header.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// An error occurred decoding an IPv4 or UDP header.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The underlying `sendto` call failed.
    #[error("failed to transmit datagram: {0}")]
    Transmit(io::Error),
    /// Releasing the raw socket failed.
    #[error("failed to close raw socket: {0}")]
    Close(io::Error),
    /// The connection was used after being closed.
    #[error("connection is closed")]
    ConnectionClosed,
}

/// Represents errors that can occur while parsing a `host:port` endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AddrError {
    /// The endpoint has no `:port` suffix.
    #[error("invalid address {0:?}: missing port")]
    MissingPort(String),
    /// The host is not a valid IPv4 literal or name, e.g. it carries extra
    /// colons or unbalanced brackets.
    #[error("invalid host {0:?}: expected an IPv4 address or a host name")]
    InvalidHost(String),
    /// The port is not a decimal number within `0..=65535`.
    #[error("invalid port {0:?}: must be a decimal number in 0..=65535")]
    InvalidPort(String),
    /// The host could not be resolved.
    #[error("failed to resolve host {host:?}: {source}")]
    Resolve {
        /// The host that failed to resolve.
        host: String,
        /// The resolver error.
        #[source]
        source: io::Error,
    },
    /// The host resolved, but to no IPv4 address.
    #[error("host {0:?} has no IPv4 address")]
    NoIpv4(String),
}

/// Represents errors that can occur when constructing or encoding an IPv4 or
/// UDP header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// Total datagram length exceeds the maximum allowed for an IPv4 packet.
    #[error(
        "packet too large: {provided} bytes (exceeds maximum allowed {maximum} bytes)"
    )]
    PacketTooLarge {
        /// The total datagram length that was requested.
        provided: usize,
        /// The maximum allowed IPv4 total length.
        maximum: u16,
    },
    /// Writing a header to its output failed.
    #[error("failed to encode {header} header: {source}")]
    Encode {
        /// Name of the header being written.
        header: &'static str,
        /// The underlying write failure.
        #[source]
        source: io::Error,
    },
}

/// Represents errors that can occur while decoding an IPv4 or UDP header.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input buffer is smaller than the minimum header length.
    #[error(
        "invalid buffer length: {provided} bytes (less than minimum required {minimum} bytes)"
    )]
    InvalidBufferLength {
        /// The length of the input buffer provided.
        provided: usize,
        /// The minimum required length for the header.
        minimum: u16,
    },
    /// Invalid IPv4 version value.
    #[error("invalid IP version: {provided} (must be {expected}, indicating IPv4)")]
    InvalidVersion {
        /// The version value provided.
        provided: u8,
        /// The expected version value (4).
        expected: u8,
    },
    /// Invalid IPv4 IHL value.
    #[error(
        "invalid IHL: {provided} (expected {expected} since IP options are not supported)"
    )]
    InvalidIhl {
        /// The IHL value provided.
        provided: u8,
        /// The expected IHL value (5).
        expected: u8,
    },
    /// The length field is smaller than the header it belongs to.
    #[error(
        "invalid total length: {provided} bytes (less than indicated header length {minimum} bytes)"
    )]
    InvalidTotalLength {
        /// The length value provided.
        provided: u16,
        /// The header length the value must at least cover.
        minimum: u16,
    },
    /// Protocol number not known to this crate.
    #[error("invalid protocol: {0}")]
    InvalidProtocol(u8),
}
