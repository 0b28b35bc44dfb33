//! IPv4 address conversions.
//!
//! Dotted-quad strings, their big-endian `u32` form, CIDR blocks as inclusive
//! integer ranges, and the coarse bucket ids the reverse index is keyed by.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::{Error, Result};

/// Reject IPv6 literals before any IPv4 parsing is attempted.
fn ensure_v4(input: &str) -> Result<()> {
    if input.contains(':') {
        return Err(Error::UnsupportedAddressFamily(input.to_string()));
    }
    Ok(())
}

/// Convert a dotted-quad address to its integer form.
///
/// # Examples
/// ```
/// use sonarsearch::ipconv::ip_to_int;
///
/// assert_eq!(ip_to_int("1.2.3.4").unwrap(), 16909060);
/// assert!(ip_to_int("::1").is_err());
/// ```
pub fn ip_to_int(addr: &str) -> Result<u32> {
    let addr = addr.trim();
    ensure_v4(addr)?;
    addr.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| Error::InvalidAddress(addr.to_string()))
}

/// Convert an integer back to its dotted-quad form. Total.
pub fn int_to_ip(n: u32) -> String {
    Ipv4Addr::from(n).to_string()
}

/// Parse a CIDR block into its inclusive `(min, max)` integer range.
///
/// A bare address is an implicit `/32`. Host bits below the prefix are
/// ignored, so `192.168.1.77/24` covers the same range as `192.168.1.0/24`.
pub fn cidr_to_range(cidr: &str) -> Result<(u32, u32)> {
    let net = parse_cidr(cidr)?;
    Ok((u32::from(net.network()), u32::from(net.broadcast())))
}

/// Parse a CIDR block, treating a bare address as `/32`.
pub fn parse_cidr(cidr: &str) -> Result<Ipv4Net> {
    let cidr = cidr.trim();
    ensure_v4(cidr)?;

    if !cidr.contains('/') {
        let addr = cidr
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::InvalidAddress(cidr.to_string()))?;
        return Ipv4Net::new(addr, 32).map_err(|_| Error::InvalidAddress(cidr.to_string()));
    }

    cidr.parse::<Ipv4Net>()
        .map_err(|_| Error::InvalidAddress(cidr.to_string()))
}

/// Bucket id of an address integer: `floor(n / bucket_size)`.
///
/// A zero bucket size is treated as 1.
pub fn bucket_of(n: u32, bucket_size: u32) -> u32 {
    n / bucket_size.max(1)
}
