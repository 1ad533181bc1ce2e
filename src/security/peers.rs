//! Peer address allow-list.
//!
//! # Responsibilities
//! - Parse the comma-separated allow-list (addresses, CIDR blocks, hostnames)
//! - Resolve hostnames once at construction
//! - Answer whether a remote address may send data
//!
//! # Design Decisions
//! - IPv4-mapped (`::ffff:a.b.c.d`) and IPv4-compatible (`::a.b.c.d`) IPv6
//!   addresses are compared as their IPv4 form
//! - A `/0` block matches every address of its family
//! - Immutable after construction; shared across requests without locking

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use thiserror::Error;

/// Error raised while building the allow-list.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("allowed peer list is empty")]
    Empty,

    #[error("invalid allowed peer {entry:?}: {reason}")]
    Invalid { entry: String, reason: String },

    #[error("failed to resolve allowed peer {entry:?}: {source}")]
    Unresolvable {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// An address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    /// Parse `addr/prefix`. The address is masked to the prefix.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| "missing prefix length".to_string())?;
        let addr: IpAddr = addr.parse().map_err(|e| format!("{e}"))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("invalid prefix length {prefix:?}"))?;

        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(format!("prefix length {prefix} exceeds {max}"));
        }

        // An IPv4 block written in mapped IPv6 form covers the same IPv4 range.
        let (addr, prefix) = match addr {
            IpAddr::V6(v6) if prefix >= 96 => match v6.to_ipv4_mapped() {
                Some(v4) => (IpAddr::V4(v4), prefix - 96),
                None => (addr, prefix),
            },
            _ => (addr, prefix),
        };

        Ok(Self {
            addr: mask(addr, prefix),
            prefix,
        })
    }

    /// Returns true if `ip` lies inside this block.
    ///
    /// `::/0` matches every address of either family; `0.0.0.0/0` matches
    /// IPv4 (and mapped IPv6) only.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, canonical(ip)) {
            (IpAddr::V6(_), _) if self.prefix == 0 => true,
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let m = v4_mask(self.prefix);
                u32::from(net) & m == u32::from(ip) & m
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let m = v6_mask(self.prefix);
                u128::from(net) & m == u128::from(ip) & m
            }
            _ => false,
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

fn v4_mask(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

fn v6_mask(prefix: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0)
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix))),
    }
}

/// Collapse IPv4-mapped and IPv4-compatible IPv6 addresses to IPv4.
///
/// `::` and `::1` stay IPv6.
pub fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return IpAddr::V4(v4);
            }
            let bits = u128::from(v6);
            if bits >> 32 == 0 && bits > 1 {
                return IpAddr::V4(Ipv4Addr::from(bits as u32));
            }
            ip
        }
        IpAddr::V4(_) => ip,
    }
}

#[derive(Debug, Clone)]
enum PeerMatcher {
    Address(IpAddr),
    Network(IpNetwork),
}

impl PeerMatcher {
    fn matches(&self, ip: IpAddr) -> bool {
        match self {
            PeerMatcher::Address(addr) => *addr == ip,
            PeerMatcher::Network(net) => net.contains(ip),
        }
    }
}

/// Set of peers allowed to reach the ingest endpoints.
#[derive(Debug, Clone)]
pub struct AllowedPeers {
    matchers: Vec<PeerMatcher>,
}

impl AllowedPeers {
    /// Build the allow-list from a comma-separated configuration string.
    ///
    /// Hostnames are resolved here, once, with the system resolver.
    pub fn parse(list: &str) -> Result<Self, PeerError> {
        let mut matchers = Vec::new();

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if entry.contains('/') {
                let net = IpNetwork::parse(entry).map_err(|reason| PeerError::Invalid {
                    entry: entry.to_string(),
                    reason,
                })?;
                matchers.push(PeerMatcher::Network(net));
                continue;
            }

            if let Ok(ip) = entry.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
                matchers.push(PeerMatcher::Address(canonical(ip)));
                continue;
            }

            if !is_hostname(entry) {
                return Err(PeerError::Invalid {
                    entry: entry.to_string(),
                    reason: "not an address, CIDR block or hostname".to_string(),
                });
            }

            let resolved = (entry, 0)
                .to_socket_addrs()
                .map_err(|source| PeerError::Unresolvable {
                    entry: entry.to_string(),
                    source,
                })?;

            let before = matchers.len();
            for addr in resolved {
                tracing::debug!(host = entry, address = %addr.ip(), "Resolved allowed peer");
                matchers.push(PeerMatcher::Address(canonical(addr.ip())));
            }
            if matchers.len() == before {
                return Err(PeerError::Unresolvable {
                    entry: entry.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
                });
            }
        }

        if matchers.is_empty() {
            return Err(PeerError::Empty);
        }

        Ok(Self { matchers })
    }

    /// Returns true if `ip` matches any configured entry.
    pub fn allows(&self, ip: IpAddr) -> bool {
        let ip = canonical(ip);
        self.matchers.iter().any(|m| m.matches(ip))
    }

    /// Number of resolved matchers.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

fn is_hostname(s: &str) -> bool {
    s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
