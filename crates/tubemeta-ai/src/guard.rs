//! Outbound fetch guard.
//!
//! Image downloads take URLs that originate from users. The URL text is
//! checked by the API layer; this module covers what the text cannot show:
//! the addresses a hostname actually resolves to.

use std::net::{IpAddr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use thiserror::Error;
use tracing::warn;

/// A hostname that resolved only to internal addresses.
#[derive(Debug, Error)]
#[error("{0} resolves only to internal addresses")]
pub struct BlockedHost(pub String);

/// Whether an address belongs to loopback, private, link-local or other
/// non-public ranges.
pub fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (64..128).contains(&v4.octets()[1]))
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_internal_ip(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Keep only public addresses, failing when none remain.
pub fn public_addrs(
    host: &str,
    addrs: impl IntoIterator<Item = SocketAddr>,
) -> Result<Vec<SocketAddr>, BlockedHost> {
    let public: Vec<SocketAddr> = addrs.into_iter().filter(|a| !is_internal_ip(a.ip())).collect();
    if public.is_empty() {
        warn!(host = %host, "Refusing to connect to internal address");
        return Err(BlockedHost(host.to_string()));
    }
    Ok(public)
}

/// DNS resolver that never hands reqwest an internal address.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let resolved = tokio::net::lookup_host((host.as_str(), 0)).await?;
            let addrs: Addrs = Box::new(public_addrs(&host, resolved)?.into_iter());
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_internal_ranges() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.0.1", "169.254.169.254", "100.64.0.1", "::1", "fd00::1", "fe80::1", "::ffff:127.0.0.1"] {
            assert!(is_internal_ip(ip.parse().unwrap()), "{} should be internal", ip);
        }
        for ip in ["8.8.8.8", "1.1.1.1", "2606:4700::1111"] {
            assert!(!is_internal_ip(ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[test]
    fn test_public_addrs_filters_mixed_answers() {
        let public = SocketAddr::from((Ipv4Addr::new(93, 184, 216, 34), 0));
        let answers = vec![SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), public];
        assert_eq!(public_addrs("example.com", answers).unwrap(), vec![public]);
    }

    #[test]
    fn test_public_addrs_rejects_internal_only() {
        let answers = vec![
            SocketAddr::from((Ipv4Addr::new(169, 254, 169, 254), 0)),
            SocketAddr::from((Ipv6Addr::LOCALHOST, 0)),
        ];
        let err = public_addrs("rebind.example", answers).unwrap_err();
        assert_eq!(err.0, "rebind.example");
    }
}
