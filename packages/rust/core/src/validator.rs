//! SSRF-safe validation of source URLs.
//!
//! A [`SourceUrl`] can only be built by [`UrlGuard::validate`], so holding one
//! proves the URL was checked before any crawler saw it.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::boundary::HostResolver;

/// Longest URL accepted.
pub const MAX_URL_LEN: usize = 2048;

/// Host names that always point at internal infrastructure.
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "metadata.google.internal",
    "metadata.gke.internal",
    "instance-data",
];

/// Host suffixes reserved for local or internal networks.
const BLOCKED_SUFFIXES: &[&str] = &[".local", ".internal", ".localhost"];

/// A URL that passed validation. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl(Url);

impl SourceUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host name (always present on a validated URL).
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Why a URL was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("URL longer than {} characters", MAX_URL_LEN)]
    TooLong,

    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("blocked host `{0}`")]
    BlockedHost(String),

    #[error("`{host}` points at non-public address {ip}")]
    NonPublicAddress { host: String, ip: IpAddr },

    #[error("could not resolve `{host}`: {reason}")]
    Unresolvable { host: String, reason: String },
}

/// Validates candidate URLs, resolving host names through a [`HostResolver`].
#[derive(Clone)]
pub struct UrlGuard {
    resolver: Arc<dyn HostResolver>,
}

impl UrlGuard {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self { resolver }
    }

    /// Check `raw` and return it as a [`SourceUrl`].
    ///
    /// DNS failures are rejections, never errors. Every resolved address
    /// must be public.
    pub async fn validate(&self, raw: &str) -> Result<SourceUrl, Rejection> {
        let url = check_static(raw)?;
        let host = url.host_str().ok_or(Rejection::MissingHost)?.to_string();

        // IP literals were already judged by `check_static`.
        if literal_ip(&url).is_some() {
            return Ok(SourceUrl(url));
        }

        let port = url.port_or_known_default().unwrap_or(443);
        let addrs = self
            .resolver
            .resolve(&host, port)
            .await
            .map_err(|e| Rejection::Unresolvable {
                host: host.clone(),
                reason: e.to_string(),
            })?;

        if addrs.is_empty() {
            return Err(Rejection::Unresolvable {
                host,
                reason: "no addresses".into(),
            });
        }

        if let Some(ip) = addrs.iter().find(|ip| !is_public_ip(ip)) {
            return Err(Rejection::NonPublicAddress { host, ip: *ip });
        }

        debug!(url = %url, addrs = addrs.len(), "url validated");
        Ok(SourceUrl(url))
    }
}

/// Checks that need no network access: syntax, scheme, length, host name
/// and IP-literal ranges.
pub fn check_static(raw: &str) -> Result<Url, Rejection> {
    let raw = raw.trim();
    if raw.len() > MAX_URL_LEN {
        return Err(Rejection::TooLong);
    }

    let url = Url::parse(raw).map_err(|e| Rejection::Malformed(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(Rejection::UnsupportedScheme(other.to_string())),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(Rejection::MissingHost)?
        .to_ascii_lowercase();

    if let Some(ip) = literal_ip(&url) {
        if !is_public_ip(&ip) {
            return Err(Rejection::NonPublicAddress { host, ip });
        }
        return Ok(url);
    }

    let bare = host.trim_end_matches('.');
    if BLOCKED_HOSTS.contains(&bare) || BLOCKED_SUFFIXES.iter().any(|s| bare.ends_with(s)) {
        return Err(Rejection::BlockedHost(host));
    }

    Ok(url)
}

fn literal_ip(url: &Url) -> Option<IpAddr> {
    match url.host()? {
        url::Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
        url::Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
        url::Host::Domain(_) => None,
    }
}

/// True when `ip` is routable on the public internet.
pub fn is_public_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(&v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(v4: &Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    !(v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10 (carrier-grade NAT)
        || (a == 100 && (b & 0xC0) == 64)
        // 192.0.0.0/24
        || (a == 192 && b == 0 && c == 0)
        // 0.0.0.0/8 and 240.0.0.0/4
        || a == 0
        || a >= 240)
}

fn is_public_v6(v6: &Ipv6Addr) -> bool {
    let first = v6.segments()[0];
    !(v6.is_loopback()
        || v6.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80)
}
