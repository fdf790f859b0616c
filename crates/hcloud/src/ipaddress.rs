//! IP address helpers.

use std::net::{IpAddr, Ipv6Addr};

use thiserror::Error;

/// Errors for malformed addresses and networks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpAddressError {
    /// The value is not an address or a network in CIDR notation.
    #[error("invalid IP address or network: {0}")]
    Invalid(String),
}

fn parse_prefix(value: &str, prefix: &str, max: u8) -> Result<u8, IpAddressError> {
    prefix
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= max)
        .ok_or_else(|| IpAddressError::Invalid(value.to_string()))
}

/// Parse an IPv6 network in CIDR notation. Host bits are cleared.
///
/// # Errors
/// Returns error if `network` is not `<ipv6>/<prefix>`.
pub fn parse_ipv6_network(network: &str) -> Result<(Ipv6Addr, u8), IpAddressError> {
    let (address, prefix) = network
        .split_once('/')
        .ok_or_else(|| IpAddressError::Invalid(network.to_string()))?;
    let address: Ipv6Addr = address
        .parse()
        .map_err(|_| IpAddressError::Invalid(network.to_string()))?;
    let prefix = parse_prefix(network, prefix, 128)?;

    let mask = u128::MAX.checked_shl(u32::from(128 - prefix)).unwrap_or(0);
    Ok((Ipv6Addr::from(u128::from(address) & mask), prefix))
}

/// First host address of an IPv6 network.
///
/// The network address itself is skipped, except for `/127` and `/128`
/// networks where every address is a host.
///
/// # Errors
/// Returns error if `network` is not a valid IPv6 network.
pub fn first_ipv6_address(network: &str) -> Result<Ipv6Addr, IpAddressError> {
    let (address, prefix) = parse_ipv6_network(network)?;
    if prefix >= 127 {
        return Ok(address);
    }
    Ok(Ipv6Addr::from(u128::from(address) + 1))
}

/// Normalize an address or interface to `<address>/<prefix>`.
///
/// Addresses without prefix get `/32` or `/128`, IPv6 addresses are
/// compressed and lower cased.
///
/// # Errors
/// Returns error if `value` is not a valid address.
pub fn normalize_ip(value: &str) -> Result<String, IpAddressError> {
    let value = value.trim();
    let (address, prefix) = match value.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (value, None),
    };

    let address: IpAddr = address
        .parse()
        .map_err(|_| IpAddressError::Invalid(value.to_string()))?;
    let max = if address.is_ipv4() { 32 } else { 128 };
    let prefix = match prefix {
        Some(prefix) => parse_prefix(value, prefix, max)?,
        None => max,
    };

    Ok(format!("{address}/{prefix}"))
}
