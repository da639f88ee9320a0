//! Parsing of `host:port` destination endpoints.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

use crate::{AddrError, Result};

/// Parses a `host:port` endpoint into an IPv4 socket address.
///
/// `host` is either a dotted-decimal IPv4 literal or a name resolved with the
/// system resolver, in which case the first IPv4 result is used. It may be
/// wrapped in square brackets. `port` is a decimal number in `0..=65535`.
///
/// # Errors
///
/// Returns an error if the port is missing or malformed, if the host contains
/// a colon (IPv6 literals are not supported), if the host cannot be resolved,
/// or if it resolves to no IPv4 address.
pub fn parse_endpoint(endpoint: &str) -> Result<SocketAddrV4> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| AddrError::MissingPort(endpoint.to_string()))?;

    let host = parse_host(host)?;
    let port = parse_port(port)?;

    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    let resolved = (host, port)
        .to_socket_addrs()
        .map_err(|source| AddrError::Resolve {
            host: host.to_string(),
            source,
        })?
        .find_map(|addr| match addr {
            SocketAddr::V4(addr) => Some(addr),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| AddrError::NoIpv4(host.to_string()))?;

    Ok(resolved)
}

fn parse_host(host: &str) -> Result<&str> {
    let host = match host.strip_prefix('[') {
        Some(inner) => inner
            .strip_suffix(']')
            .ok_or_else(|| AddrError::InvalidHost(host.to_string()))?,
        None => host,
    };

    // Colons left over mean either an IPv6 literal or a malformed endpoint.
    if host.contains([':', '[', ']']) {
        return Err(AddrError::InvalidHost(host.to_string()).into());
    }

    Ok(host)
}

fn parse_port(port: &str) -> Result<u16> {
    // `u16::from_str` also accepts a leading `+`.
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddrError::InvalidPort(port.to_string()).into());
    }

    port.parse::<u16>()
        .map_err(|_| AddrError::InvalidPort(port.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn parse_endpoint_ipv4_literal() {
        let addr = parse_endpoint("203.0.113.5:9999").unwrap();

        assert_eq!(addr, SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 9999));
    }

    #[test]
    fn parse_endpoint_port_bounds() {
        assert_eq!(parse_endpoint("10.0.0.1:0").unwrap().port(), 0);
        assert_eq!(parse_endpoint("10.0.0.1:65535").unwrap().port(), 65535);
    }

    #[test]
    fn parse_endpoint_missing_port() {
        assert!(matches!(
            parse_endpoint("203.0.113.5"),
            Err(Error::AddrParse(AddrError::MissingPort(_)))
        ));
    }

    #[test]
    fn parse_endpoint_invalid_port() {
        for endpoint in ["10.0.0.1:", "10.0.0.1:65536", "10.0.0.1:+80", "10.0.0.1:http"] {
            assert!(
                matches!(
                    parse_endpoint(endpoint),
                    Err(Error::AddrParse(AddrError::InvalidPort(_)))
                ),
                "{endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn parse_endpoint_bracketed_host() {
        let addr = parse_endpoint("[203.0.113.5]:9999").unwrap();

        assert_eq!(addr, SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 9999));
    }

    #[test]
    fn parse_endpoint_invalid_host() {
        for endpoint in ["a:b:80", "[::1]:80", "::1:80", "[10.0.0.1:80", "10.0.0.1]:80"] {
            assert!(
                matches!(
                    parse_endpoint(endpoint),
                    Err(Error::AddrParse(AddrError::InvalidHost(_)))
                ),
                "{endpoint} should be rejected"
            );
        }
    }
}
