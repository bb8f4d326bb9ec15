//! SSRF guard: decides whether a URL may be fetched.
//!
//! [`check_literal`] covers everything knowable from the URL text (scheme,
//! port, host names, IP literals). [`resolve_safe`] additionally resolves the
//! host and rejects the URL if *any* resolved address is not publicly
//! routable; the fetcher then pins its connection to those addresses so a
//! second DNS answer cannot redirect it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use url::{Host, Url};

use crate::config::FetchConfig;
use crate::error::UnsafeUrl;

/// Cloud instance-metadata endpoints (AWS/GCP/Azure, Alibaba, Oracle, AWS IPv6).
const METADATA_ADDRS: [IpAddr; 4] = [
    IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254)),
    IpAddr::V4(Ipv4Addr::new(100, 100, 100, 200)),
    IpAddr::V4(Ipv4Addr::new(192, 0, 0, 192)),
    IpAddr::V6(Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254)),
];

const BLOCKED_HOSTS: [&str; 3] = ["localhost", "metadata", "metadata.google.internal"];
const BLOCKED_SUFFIXES: [&str; 3] = [".localhost", ".internal", ".local"];

/// What the guard permits.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    pub allowed_ports: Vec<u16>,
    pub allow_private_networks: bool,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl UrlPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            allowed_ports: config.allowed_ports.clone(),
            allow_private_networks: config.allow_private_networks,
        }
    }
}

/// A URL that passed every check, with the addresses it is allowed to reach.
#[derive(Debug, Clone)]
pub struct SafeTarget {
    pub url: Url,
    /// `Some(host)` for domain names, `None` for IP literals.
    pub domain: Option<String>,
    pub addrs: Vec<SocketAddr>,
}

/// Every check that does not require DNS.
pub fn check_literal(raw: &str, policy: &UrlPolicy) -> Result<Url, UnsafeUrl> {
    let url = Url::parse(raw).map_err(|e| UnsafeUrl::Malformed(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UnsafeUrl::Scheme(other.to_string())),
    }

    let port = url.port_or_known_default().ok_or(UnsafeUrl::MissingHost)?;
    if !policy.allowed_ports.contains(&port) {
        return Err(UnsafeUrl::Port(port));
    }

    match url.host() {
        None => return Err(UnsafeUrl::MissingHost),
        Some(_) if policy.allow_private_networks => {}
        Some(Host::Domain(domain)) => {
            let name = domain.trim_end_matches('.').to_ascii_lowercase();
            if BLOCKED_HOSTS.contains(&name.as_str())
                || BLOCKED_SUFFIXES.iter().any(|s| name.ends_with(s))
            {
                return Err(UnsafeUrl::BlockedHost(name));
            }
        }
        Some(Host::Ipv4(ip)) => check_address(IpAddr::V4(ip))?,
        Some(Host::Ipv6(ip)) => check_address(IpAddr::V6(ip))?,
    }

    Ok(url)
}

/// Full check including DNS resolution of domain hosts.
pub async fn resolve_safe(raw: &str, policy: &UrlPolicy) -> Result<SafeTarget, UnsafeUrl> {
    let url = check_literal(raw, policy)?;
    let port = url.port_or_known_default().ok_or(UnsafeUrl::MissingHost)?;

    let (domain, addrs) = match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_string();
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((domain.as_str(), port))
                .await
                .map_err(|_| UnsafeUrl::Unresolvable(domain.clone()))?
                .collect();
            if addrs.is_empty() {
                return Err(UnsafeUrl::Unresolvable(domain));
            }
            (Some(domain), addrs)
        }
        Some(Host::Ipv4(ip)) => (None, vec![SocketAddr::new(IpAddr::V4(ip), port)]),
        Some(Host::Ipv6(ip)) => (None, vec![SocketAddr::new(IpAddr::V6(ip), port)]),
        None => return Err(UnsafeUrl::MissingHost),
    };

    if !policy.allow_private_networks {
        check_resolved(&addrs)?;
    }

    Ok(SafeTarget { url, domain, addrs })
}

/// Convenience predicate over [`resolve_safe`].
pub async fn is_safe(raw: &str, policy: &UrlPolicy) -> bool {
    match resolve_safe(raw, policy).await {
        Ok(_) => true,
        Err(reason) => {
            tracing::debug!(url = %raw, %reason, "url rejected");
            false
        }
    }
}

/// Reject the whole set if any resolved address is not public.
pub fn check_resolved(addrs: &[SocketAddr]) -> Result<(), UnsafeUrl> {
    addrs.iter().try_for_each(|a| check_address(a.ip()))
}

fn check_address(ip: IpAddr) -> Result<(), UnsafeUrl> {
    if is_public_ip(ip) {
        Ok(())
    } else {
        Err(UnsafeUrl::BlockedAddress(ip))
    }
}

/// True only for globally routable unicast addresses.
pub fn is_public_ip(ip: IpAddr) -> bool {
    if METADATA_ADDRS.contains(&ip) {
        return false;
    }
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4) && !METADATA_ADDRS.contains(&IpAddr::V4(v4)),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || a == 0
        // carrier-grade NAT 100.64.0.0/10
        || (a == 100 && (b & 0xc0) == 64)
        // benchmarking 198.18.0.0/15
        || (a == 198 && (b & 0xfe) == 18)
        // IETF protocol assignments 192.0.0.0/24
        || (a == 192 && b == 0 && ip.octets()[2] == 0)
        // reserved 240.0.0.0/4
        || a >= 240)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // unique local fc00::/7
        || (first & 0xfe00) == 0xfc00
        // link local fe80::/10
        || (first & 0xffc0) == 0xfe80
        // documentation 2001:db8::/32
        || (first == 0x2001 && ip.segments()[1] == 0x0db8))
}
