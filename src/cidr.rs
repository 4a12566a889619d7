//! Minimal IPv4 CIDR arithmetic for environment isolation rules.
//!
//! Only what the differential rules need: parse, normalize to the network
//! address, and range overlap. Host bits below the prefix are masked off
//! rather than rejected, matching how VPC CIDRs are commonly written.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// An IPv4 network in CIDR notation, e.g. `10.1.0.0/16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, ComplianceError> {
        if prefix > 32 {
            return Err(ComplianceError::InvalidCidr(format!(
                "{addr}/{prefix}: prefix length must be 0-32"
            )));
        }
        let masked = u32::from(addr) & Self::mask(prefix);
        Ok(Cidr {
            network: Ipv4Addr::from(masked),
            prefix,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        }
    }

    fn first(&self) -> u32 {
        u32::from(self.network)
    }

    fn last(&self) -> u32 {
        self.first() | !Self::mask(self.prefix)
    }

    /// Whether the two networks share any address.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Whether the address falls inside this network.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let addr = u32::from(addr);
        self.first() <= addr && addr <= self.last()
    }
}

impl FromStr for Cidr {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| ComplianceError::InvalidCidr(format!("{s}: missing prefix length")))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| ComplianceError::InvalidCidr(format!("{s}: invalid IPv4 address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| ComplianceError::InvalidCidr(format!("{s}: invalid prefix length")))?;
        Cidr::new(addr, prefix)
    }
}

impl Display for Cidr {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        distinct_second_octet = { "10.1.0.0/16", "10.2.0.0/16", false },
        same_network = { "10.1.0.0/16", "10.1.0.0/16", true },
        subnet_of = { "10.1.0.0/16", "10.1.4.0/24", true },
        adjacent = { "10.0.0.0/24", "10.0.1.0/24", false },
    )]
    fn test_overlaps(a: &str, b: &str, expected: bool) {
        let a: Cidr = a.parse().unwrap();
        let b: Cidr = b.parse().unwrap();
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let cidr: Cidr = "10.1.5.7/16".parse().unwrap();
        assert_eq!(cidr.to_string(), "10.1.0.0/16");
    }

    #[test]
    fn test_contains() {
        let cidr: Cidr = "10.1.0.0/16".parse().unwrap();
        assert!(cidr.contains("10.1.255.1".parse().unwrap()));
        assert!(!cidr.contains("10.2.0.1".parse().unwrap()));
    }

    #[parameterized(
        no_prefix = { "10.1.0.0" },
        bad_address = { "10.1.0/16" },
        bad_prefix = { "10.1.0.0/33" },
        garbage = { "not-a-cidr" },
    )]
    fn test_invalid_cidr(input: &str) {
        assert!(matches!(
            input.parse::<Cidr>(),
            Err(ComplianceError::InvalidCidr(_))
        ));
    }
}
