use std::net::{IpAddr, Ipv4Addr};

use crate::error::EtlError;

/// Parse a dotted-decimal IPv4 address (or an IPv4-mapped IPv6 address)
/// into its big-endian packed form.
pub fn parse_ip(s: &str) -> Result<u32, EtlError> {
    let addr: IpAddr = s
        .trim()
        .parse()
        .map_err(|_| EtlError::InvalidIp(s.to_string()))?;

    let v4 = match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .ok_or_else(|| EtlError::InvalidIp(s.to_string()))?,
    };
    Ok(u32::from(v4))
}

/// Inverse of [`parse_ip`] for dotted-decimal input.
pub fn format_ip(ip: u32) -> String {
    Ipv4Addr::from(ip).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_big_endian() {
        assert_eq!(parse_ip("1.2.3.4").unwrap(), 0x0102_0304);
        assert_eq!(parse_ip("0.0.0.0").unwrap(), 0);
        assert_eq!(parse_ip("255.255.255.255").unwrap(), u32::MAX);
    }

    #[test]
    fn test_round_trip_dotted_decimal() {
        for s in ["1.2.3.4", "10.0.0.1", "192.168.100.254", "0.0.0.0", "255.255.255.255", "8.8.4.4"] {
            assert_eq!(format_ip(parse_ip(s).unwrap()), s);
        }
    }

    #[test]
    fn test_round_trip_integer_samples() {
        for ip in [0u32, 1, 0x7f00_0001, 0xc0a8_0001, 0xdead_beef, u32::MAX] {
            assert_eq!(parse_ip(&format_ip(ip)).unwrap(), ip);
        }
    }

    #[test]
    fn test_ipv4_mapped_ipv6_accepted() {
        assert_eq!(parse_ip("::ffff:1.2.3.4").unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        for s in ["", "-", "1.2.3", "256.1.1.1", "example.com", "::1"] {
            assert!(parse_ip(s).is_err(), "{s:?} should be rejected");
        }
    }
}
