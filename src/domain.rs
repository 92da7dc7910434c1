use std::net::Ipv4Addr;

/// Trim, lowercase and drop the trailing root dot.
pub fn normalize_host(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Drops a `:port` suffix. Bracketed IPv6 literals keep their brackets and
/// are rejected later by the charset check.
pub fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Canonical form used as the registry key: normalized, port-less, no `www.`.
pub fn canonical_host(raw: &str) -> String {
    let host = normalize_host(raw);
    let host = strip_port(&host);
    // the port may have hidden a trailing dot, e.g. `example.com.:443`
    strip_www(host.trim_end_matches('.')).to_string()
}

/// The platform's own default/fallback tenant. Never validated, never
/// deleted, never issued a certificate. Both sides are compared in
/// canonical form.
pub fn is_reserved(host: &str, reserved: &str) -> bool {
    let reserved = canonical_host(reserved);
    !reserved.is_empty() && canonical_host(host) == reserved
}

pub fn is_ipv4_literal(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok()
}

/// Conservative hostname charset: `[a-z0-9.-]`, non-empty.
pub fn has_hostname_charset(host: &str) -> bool {
    !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
}

/// Registration-time check: charset, at least one dot, sane labels.
pub fn is_registrable(host: &str) -> bool {
    has_hostname_charset(host)
        && !is_ipv4_literal(host)
        && host.len() <= 253
        && host.contains('.')
        && host
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= 63 && !label.starts_with('-') && !label.ends_with('-'))
}
