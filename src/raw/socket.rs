use std::net::SocketAddrV4;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::{io, mem};

use crate::error::errno;

/// Sends fully formed IPv4 datagrams.
///
/// Implemented by [RawSocket]; connections are generic over it so they can be
/// driven without the privileges a raw socket requires.
pub trait Transmit {
    /// Sends `buf`, a complete IPv4 datagram including its header, towards
    /// `dst`. Returns the number of bytes sent.
    fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize>;

    /// Releases the underlying handle.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// A raw IPv4 socket (`SOCK_RAW`, `IPPROTO_RAW`) with header inclusion
/// enabled, so every buffer written is transmitted as the complete IP packet.
#[derive(Debug)]
pub struct RawSocket {
    fd: OwnedFd,
}

impl RawSocket {
    /// Opens a raw IPv4 socket and enables `IP_HDRINCL` on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or configured, most
    /// often because the process lacks the `CAP_NET_RAW` privilege.
    pub fn open() -> io::Result<Self> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_RAW, libc::IPPROTO_RAW) };
        if fd == -1 {
            return Err(errno!("failed to create raw IPv4 socket"));
        }

        // SAFETY: `fd` is a freshly created descriptor owned by nothing else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let enable: libc::c_int = 1;

        if unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_HDRINCL,
                &raw const enable as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        } == -1
        {
            return Err(errno!("failed to enable IP_HDRINCL on raw socket"));
        }

        log::debug!("opened raw socket (fd {})", fd.as_raw_fd());

        Ok(Self { fd })
    }

    /// Sends a complete IPv4 datagram to `dst`.
    ///
    /// # Notes
    ///
    /// It is the caller's responsibility to ensure the buffer starts with a
    /// well-formed IPv4 header. The kernel may fill in or overwrite the
    /// identification and header checksum fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the `sendto` call fails.
    pub fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize> {
        let addr = sockaddr_in(dst);

        let nbytes = unsafe {
            libc::sendto(
                self.fd.as_raw_fd(),
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                0,
                &raw const addr as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if nbytes == -1 {
            return Err(errno!("sendto {dst} failed"));
        }

        Ok(nbytes as usize)
    }

    /// Closes the raw socket, reporting any error from `close(2)`.
    ///
    /// Dropping a [RawSocket] also closes it, but silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor could not be closed.
    pub fn close(self) -> io::Result<()> {
        let fd = self.fd.into_raw_fd();

        if unsafe { libc::close(fd) } == -1 {
            return Err(errno!("failed to close raw socket (fd {fd})"));
        }

        log::debug!("closed raw socket (fd {fd})");

        Ok(())
    }
}

impl Transmit for RawSocket {
    fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize> {
        RawSocket::send_to(self, buf, dst)
    }

    fn close(self) -> io::Result<()> {
        RawSocket::close(self)
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn sockaddr_in(addr: SocketAddrV4) -> libc::sockaddr_in {
    // SAFETY: `sockaddr_in` is plain old data, all zeroes is a valid value.
    let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly",
    ))]
    {
        sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
    }

    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = addr.port().to_be();
    // `s_addr` is stored in network byte order.
    sin.sin_addr = libc::in_addr {
        s_addr: u32::from_ne_bytes(addr.ip().octets()),
    };

    sin
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn sockaddr_in_network_order() {
        let sin = sockaddr_in(SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 9999));

        assert_eq!(sin.sin_family, libc::AF_INET as libc::sa_family_t);
        assert_eq!(sin.sin_port.to_ne_bytes(), [0x27, 0x0F]);
        assert_eq!(sin.sin_addr.s_addr.to_ne_bytes(), [203, 0, 113, 5]);
    }
}
