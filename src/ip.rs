//! IPv4 address and CIDR ordering

use std::cmp::Ordering;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{SortError, SortResult, ValueKind};

/// An IPv4 address with an optional prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub address: Ipv4Addr,
    pub mask: Option<u8>,
}

impl FromStr for Cidr {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || SortError::unparsable(ValueKind::Ip, s);
        let trimmed = s.trim();

        let (address, mask) = match trimmed.split_once('/') {
            Some((address, mask)) => (address, Some(mask)),
            None => (trimmed, None),
        };

        let address = parse_octets(address).ok_or_else(unparsable)?;
        let mask = match mask {
            Some(mask) if !mask.is_empty() && mask.bytes().all(|b| b.is_ascii_digit()) => {
                let bits = mask.parse::<u8>().map_err(|_| unparsable())?;
                if bits > 32 {
                    return Err(unparsable());
                }
                Some(bits)
            }
            Some(_) => return Err(unparsable()),
            None => None,
        };

        Ok(Self { address, mask })
    }
}

/// Dotted quad of decimal octets; zero-padded octets such as `010` are accepted
fn parse_octets(address: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = address.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    match parts.next() {
        Some(_) => None,
        None => Some(Ipv4Addr::from(octets)),
    }
}

impl Ord for Cidr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Option orders None first, so a bare address precedes any CIDR block
        u32::from(self.address)
            .cmp(&u32::from(other.address))
            .then_with(|| self.mask.cmp(&other.mask))
    }
}

impl PartialOrd for Cidr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two IP or CIDR strings
pub fn compare_ips(a: &str, b: &str) -> SortResult<Ordering> {
    let a = a.parse::<Cidr>()?;
    let b = b.parse::<Cidr>()?;
    Ok(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let cidr: Cidr = "10.20.30.40/16".parse().expect("Failed to parse CIDR");
        assert_eq!(cidr.address, Ipv4Addr::new(10, 20, 30, 40));
        assert_eq!(cidr.mask, Some(16));

        let bare: Cidr = "192.168.0.1".parse().expect("Failed to parse address");
        assert_eq!(bare.mask, None);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["10.20.30", "10.20.30.400", "1.2.3.4.5", "1..2.3", "+1.2.3.4", "0256.0.0.1", "10.20.30.40/33", "10.20.30.40/", "host", "1.2.3.4/-1"] {
            assert!(bad.parse::<Cidr>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_mask_ordering() {
        let ordered = ["10.20.30.40", "10.20.30.40/4", "10.20.30.40/16"];
        for pair in ordered.windows(2) {
            assert_eq!(compare_ips(pair[0], pair[1]).unwrap(), Ordering::Less);
            assert_eq!(compare_ips(pair[1], pair[0]).unwrap(), Ordering::Greater);
        }
    }

    #[test]
    fn test_address_ordering_is_numeric() {
        assert_eq!(compare_ips("9.0.0.0", "10.0.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare_ips("10.0.0.2", "10.0.0.10").unwrap(), Ordering::Less);
        assert_eq!(compare_ips("10.0.0.10/8", "10.0.0.9").unwrap(), Ordering::Greater);
        assert_eq!(compare_ips("1.1.1.1", "1.1.1.1").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_zero_padded_octets() {
        let padded: Cidr = "010.000.000.001/08".parse().expect("Failed to parse padded address");
        assert_eq!(padded.address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(padded.mask, Some(8));

        assert_eq!(compare_ips("010.0.0.1", "10.0.0.1").unwrap(), Ordering::Equal);
        assert_eq!(compare_ips("009.0.0.1", "10.0.0.1").unwrap(), Ordering::Less);
        assert_eq!(compare_ips("010.000.000.001", "9.0.0.1").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_unparsable_is_reported() {
        let err = compare_ips("1.2.3.4", "nope").unwrap_err();
        assert!(matches!(err, SortError::Unparsable { kind: ValueKind::Ip, ref value } if value == "nope"));
    }
}
