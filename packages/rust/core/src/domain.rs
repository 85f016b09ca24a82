//! Host and domain helpers shared by the resolver and the article scorer.

use url::Url;

/// Two-label public suffixes common enough to matter for registrable domains.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "co.jp", "co.in", "com.br",
    "co.nz", "com.sg", "co.za", "com.cn",
];

/// Parse a URL the way search results and LLM output present them: a missing
/// scheme means `https://`.
pub fn parse_lenient(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok()?
    };
    url.host_str()?;
    Some(url)
}

/// Lowercased host without a leading `www.`.
pub fn host_of(raw: &str) -> Option<String> {
    let url = parse_lenient(raw)?;
    url.host_str().map(normalize_host)
}

/// Lowercase a host and drop a leading `www.` and trailing dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// The registrable part of a host (`news.bbc.co.uk` → `bbc.co.uk`).
pub fn registrable_domain(host: &str) -> String {
    let host = normalize_host(host);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if SECOND_LEVEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

/// Label-aligned suffix match: `reuters.com` matches `uk.reuters.com` but not
/// `notreuters.com`.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let host = normalize_host(host);
    let domain = normalize_host(domain);
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(&domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// True when `host` matches any entry of `domains`.
pub fn matches_any(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|d| domain_matches(host, d))
}

/// Lowercased alphanumerics only; used to compare names with domains.
pub fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Display name derived from an investor's host
/// (`https://www.blue-owl.com/x` → `Blue Owl`).
pub fn investor_name_from(url: &Url) -> String {
    let host = url.host_str().map(normalize_host).unwrap_or_default();
    let label = host.split('.').next().unwrap_or_default();

    label
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `scheme://host[:port]` of an investor URL.
pub fn investor_website_from(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}
