use crate::domain::normalize_host;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, warn};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::ResolveError,
    proto::rr::RecordType,
};

/// Record lookups the ownership check needs. Every method collapses
/// NXDOMAIN, timeouts and empty answers into an empty `Vec`.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn cname(&self, name: &str) -> Vec<String>;
    async fn ipv4(&self, name: &str) -> Vec<IpAddr>;
    async fn ipv6(&self, name: &str) -> Vec<IpAddr>;
}

/// `DnsLookup` backed by the system resolver configuration.
pub struct SystemDns {
    resolver: TokioAsyncResolver,
}

impl SystemDns {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for SystemDns {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully qualified form of `name`, so the resolver's search domains are
/// never appended to a customer domain.
pub fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

fn log_miss(kind: &str, name: &str, err: &ResolveError) {
    debug!(name, kind, error = %err, "dns lookup returned no records");
}

#[async_trait]
impl DnsLookup for SystemDns {
    async fn cname(&self, name: &str) -> Vec<String> {
        match self.resolver.lookup(fqdn(name), RecordType::CNAME).await {
            Ok(lookup) => lookup
                .record_iter()
                .filter_map(|record| record.data().and_then(|data| data.as_cname()))
                .map(|cname| cname.to_string())
                .collect(),
            Err(e) => {
                log_miss("CNAME", name, &e);
                Vec::new()
            }
        }
    }

    async fn ipv4(&self, name: &str) -> Vec<IpAddr> {
        match self.resolver.ipv4_lookup(fqdn(name)).await {
            Ok(lookup) => lookup.iter().map(|a| IpAddr::V4(a.0)).collect(),
            Err(e) => {
                log_miss("A", name, &e);
                Vec::new()
            }
        }
    }

    async fn ipv6(&self, name: &str) -> Vec<IpAddr> {
        match self.resolver.ipv6_lookup(fqdn(name)).await {
            Ok(lookup) => lookup.iter().map(|aaaa| IpAddr::V6(aaaa.0)).collect(),
            Err(e) => {
                log_miss("AAAA", name, &e);
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipMethod {
    Cname,
    #[serde(rename = "a_aaaa")]
    AAaaa,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipCheck {
    pub ok: bool,
    pub method: OwnershipMethod,
    pub detail: String,
}

impl OwnershipCheck {
    fn new(ok: bool, method: OwnershipMethod, detail: String) -> Self {
        Self { ok, method, detail }
    }
}

async fn addresses(dns: &dyn DnsLookup, name: &str) -> HashSet<IpAddr> {
    let mut set: HashSet<IpAddr> = dns.ipv4(name).await.into_iter().collect();
    set.extend(dns.ipv6(name).await);
    set
}

/// Checks that `domain` points at the platform: CNAME first, then an
/// A/AAAA intersection with `expected_target`.
///
/// Never fails: resolution errors count as "no records" and every path ends
/// in an [`OwnershipCheck`].
pub async fn resolve_ownership(
    dns: &dyn DnsLookup,
    domain: &str,
    expected_target: Option<&str>,
) -> OwnershipCheck {
    let domain = normalize_host(domain);
    let Some(expected) = expected_target.map(normalize_host).filter(|t| !t.is_empty()) else {
        warn!(domain = %domain, "expected CNAME target is not configured");
        return OwnershipCheck::new(
            false,
            OwnershipMethod::Cname,
            "platform CNAME target is not configured".to_string(),
        );
    };

    let targets: Vec<String> = dns
        .cname(&domain)
        .await
        .iter()
        .map(|t| normalize_host(t))
        .collect();

    if !targets.is_empty() {
        debug!(domain = %domain, ?targets, "found CNAME records");
        return if targets.iter().any(|t| *t == expected) {
            OwnershipCheck::new(
                true,
                OwnershipMethod::Cname,
                format!("CNAME points to {expected}"),
            )
        } else {
            OwnershipCheck::new(
                false,
                OwnershipMethod::Cname,
                format!(
                    "CNAME points to {} instead of {expected}",
                    targets.join(", ")
                ),
            )
        };
    }

    // Apex or flattened CNAME: compare address sets.
    let candidate = addresses(dns, &domain).await;
    if candidate.is_empty() {
        return OwnershipCheck::new(
            false,
            OwnershipMethod::AAaaa,
            format!("no CNAME and no A/AAAA records found for {domain}"),
        );
    }
    let platform = addresses(dns, &expected).await;
    if platform.is_empty() {
        return OwnershipCheck::new(
            false,
            OwnershipMethod::AAaaa,
            format!("expected target {expected} resolves to no addresses"),
        );
    }

    match candidate.intersection(&platform).next() {
        Some(shared) => OwnershipCheck::new(
            true,
            OwnershipMethod::AAaaa,
            format!("A/AAAA record {shared} matches {expected}"),
        ),
        None => OwnershipCheck::new(
            false,
            OwnershipMethod::AAaaa,
            format!("A/AAAA records of {domain} do not match those of {expected}"),
        ),
    }
}
