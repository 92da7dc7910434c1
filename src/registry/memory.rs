//! In-memory site registry.
//!
//! Sites live in a `HashMap` behind a `tokio::sync::RwLock`; a second map
//! indexes them by domain so the gatekeeper lookup is a single read-locked
//! map hit. Not durable: state is lost on restart.
use super::{RegistryError, RegistryResult, SiteRegistry};
use crate::domain;
use crate::model::{Site, SiteId, ValidationStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    sites: HashMap<SiteId, Site>,
    by_domain: HashMap<String, SiteId>,
}

pub struct InMemoryRegistry {
    reserved_domain: String,
    next_id: AtomicU64,
    tables: RwLock<Tables>,
}

impl InMemoryRegistry {
    /// Creates the registry with the reserved fallback site seeded as id 1,
    /// stored under its canonical host.
    pub fn new(reserved_domain: impl AsRef<str>) -> Self {
        let reserved_domain = domain::canonical_host(reserved_domain.as_ref());
        let mut tables = Tables::default();
        if !reserved_domain.is_empty() {
            tables.sites.insert(1, Site::new(1, reserved_domain.clone()));
            tables.by_domain.insert(reserved_domain.clone(), 1);
        }
        Self {
            reserved_domain,
            next_id: AtomicU64::new(2),
            tables: RwLock::new(tables),
        }
    }

    async fn with_site<F>(&self, id: SiteId, apply: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut Site),
    {
        let mut tables = self.tables.write().await;
        let site = tables
            .sites
            .get_mut(&id)
            .ok_or_else(|| RegistryError::NotFound(format!("site {id}")))?;
        apply(site);
        Ok(())
    }
}

#[async_trait]
impl SiteRegistry for InMemoryRegistry {
    async fn find_domain(&self, host: &str) -> RegistryResult<Option<Site>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_domain
            .get(host)
            .and_then(|id| tables.sites.get(id))
            .cloned())
    }

    async fn get(&self, id: SiteId) -> RegistryResult<Site> {
        self.tables
            .read()
            .await
            .sites
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("site {id}")))
    }

    async fn list(&self) -> RegistryResult<Vec<Site>> {
        let mut sites: Vec<Site> = self.tables.read().await.sites.values().cloned().collect();
        sites.sort_by_key(|site| site.id);
        Ok(sites)
    }

    async fn create_site(&self, domain: &str) -> RegistryResult<Site> {
        if domain::is_reserved(domain, &self.reserved_domain) {
            return Err(RegistryError::Reserved(domain.to_string()));
        }
        let mut tables = self.tables.write().await;
        if tables.by_domain.contains_key(domain) {
            return Err(RegistryError::Conflict(format!("domain {domain} already registered")));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let site = Site::new(id, domain);
        tables.by_domain.insert(domain.to_string(), id);
        tables.sites.insert(id, site.clone());
        Ok(site)
    }

    async fn delete_site(&self, id: SiteId) -> RegistryResult<()> {
        let mut tables = self.tables.write().await;
        let site = tables
            .sites
            .get(&id)
            .ok_or_else(|| RegistryError::NotFound(format!("site {id}")))?;
        if domain::is_reserved(&site.domain, &self.reserved_domain) {
            return Err(RegistryError::Reserved(site.domain.clone()));
        }
        if let Some(site) = tables.sites.remove(&id) {
            tables.by_domain.remove(&site.domain);
        }
        Ok(())
    }

    async fn update_status(&self, id: SiteId, status: ValidationStatus) -> RegistryResult<()> {
        self.with_site(id, |site| site.validation_status = status).await
    }

    async fn update_last_checked_at(&self, id: SiteId, at: OffsetDateTime) -> RegistryResult<()> {
        self.with_site(id, |site| site.last_checked_at = Some(at)).await
    }
}
