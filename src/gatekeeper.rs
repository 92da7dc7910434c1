//! Decides whether the TLS terminator may obtain a certificate for a host it
//! has never seen. Policy only: the single I/O is one registry lookup.

use crate::domain;
use crate::registry::SiteRegistry;
use base64::{Engine as _, engine::general_purpose};
use rand::{Rng, rng};
use std::sync::Arc;
use tracing::{debug, error};

const SECRET_LEN: usize = 32;

/// Fresh random secret, base64-encoded. Used when no token is configured so
/// the gate fails closed.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    rng().fill(&mut bytes);
    general_purpose::STANDARD.encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    BadToken,
    Reserved,
    IpLiteral,
    Charset,
    Unknown,
    Lookup,
}

pub struct Gatekeeper {
    token_digest: blake3::Hash,
    reserved_domain: String,
    registry: Arc<dyn SiteRegistry>,
}

impl Gatekeeper {
    /// Keeps only the BLAKE3 digest of `token`; `blake3::Hash` equality is
    /// constant-time.
    pub fn new(token: &str, reserved_domain: impl AsRef<str>, registry: Arc<dyn SiteRegistry>) -> Self {
        Self {
            token_digest: blake3::hash(token.as_bytes()),
            reserved_domain: domain::canonical_host(reserved_domain.as_ref()),
            registry,
        }
    }

    pub async fn should_issue_certificate(&self, candidate: &str, presented_token: &str) -> bool {
        match self.check(candidate, presented_token).await {
            Ok(host) => {
                debug!(host = %host, "certificate issuance allowed");
                true
            }
            Err(reason) => {
                debug!(candidate, ?reason, "certificate issuance refused");
                false
            }
        }
    }

    /// Same policy as [`Self::should_issue_certificate`], reporting why a
    /// request was refused. Returns the canonical host on success.
    pub async fn check(&self, candidate: &str, presented_token: &str) -> Result<String, Refusal> {
        if blake3::hash(presented_token.as_bytes()) != self.token_digest {
            return Err(Refusal::BadToken);
        }

        let host = domain::canonical_host(candidate);
        if domain::is_reserved(&host, &self.reserved_domain) {
            return Err(Refusal::Reserved);
        }
        if domain::is_ipv4_literal(&host) {
            return Err(Refusal::IpLiteral);
        }
        if !domain::has_hostname_charset(&host) {
            return Err(Refusal::Charset);
        }

        match self.registry.find_domain(&host).await {
            Ok(Some(_)) => Ok(host),
            Ok(None) => Err(Refusal::Unknown),
            Err(e) => {
                error!(host = %host, error = %e, "registry lookup failed during certificate check");
                Err(Refusal::Lookup)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationStatus;
    use crate::registry::memory::InMemoryRegistry;

    const TOKEN: &str = "s3cret";

    async fn gate() -> Gatekeeper {
        let registry = Arc::new(InMemoryRegistry::new("default"));
        registry.create_site("example.com").await.unwrap();
        Gatekeeper::new(TOKEN, "default", registry)
    }

    #[tokio::test]
    async fn registered_domain_with_token_is_allowed() {
        let gate = gate().await;
        assert!(gate.should_issue_certificate("example.com", TOKEN).await);
        assert_eq!(
            gate.check("WWW.Example.COM:443", TOKEN).await,
            Ok("example.com".to_string())
        );
    }

    #[tokio::test]
    async fn token_is_checked_first() {
        let gate = gate().await;
        assert_eq!(gate.check("example.com", "wrong").await, Err(Refusal::BadToken));
        assert_eq!(gate.check("example.com", "").await, Err(Refusal::BadToken));
        assert_eq!(gate.check("default", "wrong").await, Err(Refusal::BadToken));
    }

    #[tokio::test]
    async fn hygiene_rejections() {
        let gate = gate().await;
        assert_eq!(gate.check("default", TOKEN).await, Err(Refusal::Reserved));
        assert_eq!(gate.check("www.default:443", TOKEN).await, Err(Refusal::Reserved));
        assert_eq!(gate.check("203.0.113.9", TOKEN).await, Err(Refusal::IpLiteral));
        assert_eq!(gate.check("203.0.113.9:443", TOKEN).await, Err(Refusal::IpLiteral));
        assert_eq!(gate.check("exa_mple.com", TOKEN).await, Err(Refusal::Charset));
        assert_eq!(gate.check("[::1]:443", TOKEN).await, Err(Refusal::Charset));
        assert_eq!(gate.check("", TOKEN).await, Err(Refusal::Charset));
    }

    #[tokio::test]
    async fn mixed_case_reserved_domain_is_refused() {
        let registry = Arc::new(InMemoryRegistry::new("Fallback.Test"));
        assert!(registry.create_site("fallback.test").await.is_err());
        let gate = Gatekeeper::new(TOKEN, "Fallback.Test", registry);
        assert_eq!(gate.check("www.FALLBACK.test", TOKEN).await, Err(Refusal::Reserved));
        assert_eq!(gate.check("fallback.test:443", TOKEN).await, Err(Refusal::Reserved));
    }

    #[tokio::test]
    async fn unknown_domain_is_refused() {
        let gate = gate().await;
        assert_eq!(gate.check("other.com", TOKEN).await, Err(Refusal::Unknown));
        assert_eq!(gate.check("shop.example.com", TOKEN).await, Err(Refusal::Unknown));
        assert!(!gate.should_issue_certificate("other.com", TOKEN).await);
    }

    #[tokio::test]
    async fn validation_status_is_ignored() {
        let registry = Arc::new(InMemoryRegistry::new("default"));
        let site = registry.create_site("example.com").await.unwrap();
        registry
            .update_status(site.id, ValidationStatus::DnsError)
            .await
            .unwrap();
        let gate = Gatekeeper::new(TOKEN, "default", registry);
        assert!(gate.should_issue_certificate("example.com", TOKEN).await);
    }

    #[test]
    fn generated_secrets_are_distinct_base64() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
        assert_eq!(general_purpose::STANDARD.decode(&a).unwrap().len(), SECRET_LEN);
    }
}
