//! Public address validation
//!
//! A [`PublicIp`] can only be obtained through [`PublicIp::parse`], so every
//! address that reaches the reconciler has already been checked against the
//! family it was requested for.

use crate::traits::IpVersion;
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A validated, globally meaningful address of a known family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct PublicIp(IpAddr);

impl PublicIp {
    /// Validate a candidate string for `version`
    ///
    /// Returns `None` for anything that does not parse, belongs to the other
    /// family, or falls in a private, loopback, link-local or unique-local
    /// range.
    pub fn parse(candidate: &str, version: IpVersion) -> Option<Self> {
        let candidate = candidate.trim();
        match version {
            IpVersion::V4 => {
                let addr: Ipv4Addr = candidate.parse().ok()?;
                is_public_v4(addr).then_some(Self(IpAddr::V4(addr)))
            }
            IpVersion::V6 => {
                let addr: Ipv6Addr = candidate.parse().ok()?;
                is_public_v6(addr).then_some(Self(IpAddr::V6(addr)))
            }
        }
    }

    /// Family of this address
    pub fn version(&self) -> IpVersion {
        match self.0 {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// The underlying address
    pub fn addr(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for PublicIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<PublicIp> for String {
    fn from(ip: PublicIp) -> Self {
        ip.to_string()
    }
}

fn is_public_v4(addr: Ipv4Addr) -> bool {
    // 10/8, 172.16/12, 192.168/16, 127/8, 169.254/16
    !(addr.is_private() || addr.is_loopback() || addr.is_link_local())
}

fn is_public_v6(addr: Ipv6Addr) -> bool {
    // fc00::/7
    let unique_local = (addr.segments()[0] & 0xfe00) == 0xfc00;
    !(unique_local || addr.is_loopback())
}
