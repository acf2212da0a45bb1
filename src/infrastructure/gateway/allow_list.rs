//! IP allow-list matching

use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Parsed allow-list of a credential
///
/// Entries are literal addresses or CIDR blocks. Entries that parse as
/// neither are skipped with a warning. A list that was configured but has no
/// usable entry admits nobody.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    networks: Vec<IpNet>,
    restricted: bool,
}

impl AllowList {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let networks = entries
            .iter()
            .filter_map(|entry| parse_entry(entry.as_ref()))
            .collect();

        Self {
            networks,
            restricted: !entries.is_empty(),
        }
    }

    /// Whether `ip` may use the credential
    pub fn permits(&self, ip: IpAddr) -> bool {
        if !self.restricted {
            return true;
        }

        let ip = ip.to_canonical();
        self.networks.iter().any(|net| net.contains(&ip))
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
}

fn parse_entry(entry: &str) -> Option<IpNet> {
    let entry = entry.trim();

    if let Ok(net) = entry.parse::<IpNet>() {
        return Some(net.trunc());
    }

    match entry.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ipv4Net::new(v4, 32).ok().map(IpNet::V4),
        Ok(IpAddr::V6(v6)) => Ipv6Net::new(v6, 128).ok().map(IpNet::V6),
        Err(e) => {
            tracing::warn!(entry = %entry, error = %e, "Skipping invalid IP allow-list entry");
            None
        }
    }
}
