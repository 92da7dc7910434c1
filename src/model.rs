//! Tenant site records as seen by the validation engine.
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub type SiteId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Active,
    DnsError,
    DnsOkTlsError,
    ErrorGeneric,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Active => "active",
            ValidationStatus::DnsError => "dns_error",
            ValidationStatus::DnsOkTlsError => "dns_ok_tls_error",
            ValidationStatus::ErrorGeneric => "error_generic",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub domain: String,
    pub validation_status: ValidationStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checked_at: Option<OffsetDateTime>,
}

impl Site {
    /// A freshly registered site: `pending`, never checked.
    pub fn new(id: SiteId, domain: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            validation_status: ValidationStatus::Pending,
            last_checked_at: None,
        }
    }
}
