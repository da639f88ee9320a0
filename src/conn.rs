//! Connections that send UDP datagrams under a spoofed source address.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::addr::parse_endpoint;
use crate::net::{TotalLenOrder, assemble};
use crate::raw::{RawSocket, Transmit};
use crate::{Error, Result};

/// Construction-time options for a [SpoofedConn].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Spoofed source used by [SpoofedConn::write].
    pub src: SocketAddrV4,
    /// Byte order of the IPv4 `total length` field expected by the raw-socket
    /// layer.
    pub total_len_order: TotalLenOrder,
}

impl Config {
    /// Spoofed source used when none is configured.
    pub const DEFAULT_SRC: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 54321);

    /// Sets the spoofed source used by [SpoofedConn::write].
    pub fn with_src(mut self, src: SocketAddrV4) -> Self {
        self.src = src;
        self
    }

    /// Sets the byte order of the IPv4 `total length` field.
    pub fn with_total_len_order(mut self, order: TotalLenOrder) -> Self {
        self.total_len_order = order;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: Self::DEFAULT_SRC,
            total_len_order: TotalLenOrder::native(),
        }
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    /// Number of bytes handed to the kernel, headers included.
    pub len: usize,
    /// Number of payload bytes dropped to fit a single datagram.
    pub truncated: usize,
}

impl Sent {
    /// Returns `true` if part of the payload was not sent.
    pub fn is_truncated(&self) -> bool {
        self.truncated > 0
    }
}

#[derive(Debug)]
struct State<T> {
    /// `None` once the connection is closed.
    socket: Option<T>,
    src: SocketAddrV4,
}

/// Sends UDP datagrams to a fixed destination with an arbitrary source
/// address and port.
///
/// Every operation takes the same internal lock, so a connection can be
/// shared between threads: sends never interleave, and changing the default
/// source with [SpoofedConn::set_src] is ordered against them.
///
/// Dropping an open connection drops its transmitter, which for a
/// [RawSocket] closes the file descriptor. A closed connection has already
/// released it.
#[derive(Debug)]
pub struct SpoofedConn<T = RawSocket> {
    dst: SocketAddrV4,
    total_len_order: TotalLenOrder,
    state: Mutex<State<T>>,
}

impl SpoofedConn<RawSocket> {
    /// Opens a raw socket for sending spoofed datagrams to `endpoint`, a
    /// `host:port` string.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` cannot be parsed or resolved, or if the
    /// raw socket cannot be opened, typically for lack of privilege.
    pub fn connect(endpoint: &str, config: Config) -> Result<Self> {
        let dst = parse_endpoint(endpoint)?;
        let socket = RawSocket::open().map_err(Error::SocketOpen)?;

        Ok(Self::with_transmitter(dst, config, socket))
    }
}

impl<T: Transmit> SpoofedConn<T> {
    /// Creates a connection to `dst` that sends through `transmitter`.
    pub fn with_transmitter(dst: SocketAddrV4, config: Config, transmitter: T) -> Self {
        Self {
            dst,
            total_len_order: config.total_len_order,
            state: Mutex::new(State {
                socket: Some(transmitter),
                src: config.src,
            }),
        }
    }

    /// Returns the destination of every datagram sent on this connection.
    pub fn dst(&self) -> SocketAddrV4 {
        self.dst
    }

    /// Returns the spoofed source used by [SpoofedConn::write].
    pub fn src(&self) -> SocketAddrV4 {
        self.lock().src
    }

    /// Changes the spoofed source used by [SpoofedConn::write].
    ///
    /// Waits for any in-flight send to finish.
    pub fn set_src(&self, src: SocketAddrV4) {
        self.lock().src = src;
    }

    /// Returns the byte order used for the IPv4 `total length` field.
    pub fn total_len_order(&self) -> TotalLenOrder {
        self.total_len_order
    }

    /// Returns `true` once [SpoofedConn::close] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().socket.is_none()
    }

    /// Sends `payload` from the configured spoofed source.
    ///
    /// Equivalent to [SpoofedConn::write_as] with [SpoofedConn::src], read
    /// under the same lock as the send.
    ///
    /// # Errors
    ///
    /// See [SpoofedConn::write_as].
    pub fn write(&self, payload: &[u8]) -> Result<Sent> {
        let state = self.lock();
        let src = state.src;

        self.send(&state, src, payload)
    }

    /// Sends `payload` in a single datagram that appears to come from `src`.
    ///
    /// Payloads that do not fit in one IPv4 datagram are truncated, and
    /// [Sent::truncated] reports how many bytes were dropped.
    ///
    /// # Errors
    ///
    /// Returns [Error::ConnectionClosed] after [SpoofedConn::close] without
    /// touching the socket. Otherwise returns an error if the datagram cannot
    /// be assembled or if the kernel rejects it.
    pub fn write_as(&self, src: SocketAddrV4, payload: &[u8]) -> Result<Sent> {
        let state = self.lock();

        self.send(&state, src, payload)
    }

    /// Closes the connection, releasing its socket.
    ///
    /// Closing an already closed connection does nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the socket fails. The connection is
    /// closed regardless.
    pub fn close(&self) -> Result<()> {
        let socket = self.lock().socket.take();

        match socket {
            Some(socket) => socket.close().map_err(Error::Close),
            None => Ok(()),
        }
    }

    fn send(&self, state: &State<T>, src: SocketAddrV4, payload: &[u8]) -> Result<Sent> {
        let socket = state.socket.as_ref().ok_or(Error::ConnectionClosed)?;

        let packet = assemble(src, self.dst, payload, self.total_len_order)?;

        let len = socket
            .send_to(packet.as_bytes(), self.dst)
            .map_err(Error::Transmit)?;

        log::debug!("sent {len} bytes: {src} -> {}", self.dst);

        Ok(Sent {
            len,
            truncated: packet.truncated(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Sends never leave the state half-updated, so a panic in another
        // thread does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MAX_PAYLOAD_LEN;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone)]
    struct Counting {
        sends: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl Transmit for Counting {
        fn send_to(&self, buf: &[u8], _dst: SocketAddrV4) -> io::Result<usize> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(buf.len())
        }

        fn close(self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Transmit for Failing {
        fn send_to(&self, _buf: &[u8], _dst: SocketAddrV4) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }

        fn close(self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::Other))
        }
    }

    /// Counts how many times the transmitter itself is dropped.
    #[derive(Debug)]
    struct Releasing {
        releases: Arc<AtomicUsize>,
    }

    impl Drop for Releasing {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Transmit for Releasing {
        fn send_to(&self, buf: &[u8], _dst: SocketAddrV4) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn close(self) -> io::Result<()> {
            Ok(())
        }
    }

    fn dst() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 9999)
    }

    #[test]
    fn config_defaults() {
        let config = Config::default();

        assert_eq!(config.src, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 54321));
        assert_eq!(config.total_len_order, TotalLenOrder::native());
    }

    #[test]
    fn write_reports_full_length() {
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), Counting::default());

        let sent = conn.write(b"ping").unwrap();

        assert_eq!(sent, Sent { len: 32, truncated: 0 });
        assert!(!sent.is_truncated());
    }

    #[test]
    fn write_reports_truncation() {
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), Counting::default());

        let sent = conn.write(&vec![0u8; MAX_PAYLOAD_LEN + 10]).unwrap();

        assert_eq!(sent.len, 65535);
        assert_eq!(sent.truncated, 10);
        assert!(sent.is_truncated());
    }

    #[test]
    fn write_after_close_never_sends() {
        let transmitter = Counting::default();
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), transmitter.clone());

        conn.close().unwrap();

        assert!(conn.is_closed());
        assert!(matches!(conn.write(b"ping"), Err(Error::ConnectionClosed)));
        assert!(matches!(
            conn.write_as(Config::DEFAULT_SRC, b"ping"),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(transmitter.sends.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let transmitter = Counting::default();
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), transmitter.clone());

        conn.close().unwrap();
        conn.close().unwrap();

        assert_eq!(transmitter.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transmit_failure_surfaces() {
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), Failing);

        assert!(matches!(conn.write(b"ping"), Err(Error::Transmit(_))));
    }

    #[test]
    fn close_failure_still_closes() {
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), Failing);

        assert!(matches!(conn.close(), Err(Error::Close(_))));
        assert!(conn.is_closed());
        assert!(conn.close().is_ok());
    }

    #[test]
    fn drop_releases_open_socket_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let conn = SpoofedConn::with_transmitter(
            dst(),
            Config::default(),
            Releasing {
                releases: Arc::clone(&releases),
            },
        );

        conn.write(b"ping").unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        drop(conn);

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_then_drop_releases_socket_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let conn = SpoofedConn::with_transmitter(
            dst(),
            Config::default(),
            Releasing {
                releases: Arc::clone(&releases),
            },
        );

        conn.close().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        drop(conn);

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_src_changes_default() {
        let conn = SpoofedConn::with_transmitter(dst(), Config::default(), Counting::default());
        let src = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 4000);

        conn.set_src(src);

        assert_eq!(conn.src(), src);
        assert_eq!(conn.dst(), dst());
    }
}
