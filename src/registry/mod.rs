//! Tenant registry boundary.
//!
//! The validation engine only needs a keyed lookup and two independent field
//! writes; the remaining operations exist so the HTTP surface can register
//! and remove sites.
use crate::model::{Site, SiteId, ValidationStatus};
use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

pub mod memory;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("reserved domain: {0}")]
    Reserved(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[async_trait]
pub trait SiteRegistry: Send + Sync {
    /// Exact lookup by canonical host. Read-only; must tolerate many
    /// concurrent callers.
    async fn find_domain(&self, host: &str) -> RegistryResult<Option<Site>>;
    async fn get(&self, id: SiteId) -> RegistryResult<Site>;
    async fn list(&self) -> RegistryResult<Vec<Site>>;
    async fn create_site(&self, domain: &str) -> RegistryResult<Site>;
    async fn delete_site(&self, id: SiteId) -> RegistryResult<()>;
    async fn update_status(&self, id: SiteId, status: ValidationStatus) -> RegistryResult<()>;
    async fn update_last_checked_at(&self, id: SiteId, at: OffsetDateTime) -> RegistryResult<()>;
}
