//! Validation orchestrator: DNS ownership, then HTTPS identity, then status.
//!
//! ```text
//! START -> write last_checked_at -> DNS_CHECK
//! DNS_CHECK   fail -> dns_error
//! DNS_CHECK   pass -> HTTPS_CHECK
//! HTTPS_CHECK pass -> active
//! HTTPS_CHECK fail -> dns_ok_tls_error
//! any fault        -> error_generic
//! ```
//!
//! Each run overwrites the status; nothing is merged from earlier runs. Two
//! concurrent runs for one site are not serialized and the later write wins.
use crate::dns::{self, DnsLookup, OwnershipCheck};
use crate::domain;
use crate::model::{Site, ValidationStatus};
use crate::notice::NoticeLevel;
use crate::probe::{self, HealthTransport, ProbeOptions, ProbeResult};
use crate::registry::SiteRegistry;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("{0} is the platform's default domain and is never validated")]
    ReservedDomain(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub site_id: u64,
    pub domain: String,
    pub status: ValidationStatus,
    pub level: NoticeLevel,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<OwnershipCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<ProbeResult>,
}

#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    pub expected_target: Option<String>,
    pub reserved_domain: String,
    pub probe: ProbeOptions,
}

#[derive(Clone)]
pub struct Validator {
    registry: Arc<dyn SiteRegistry>,
    dns: Arc<dyn DnsLookup>,
    transport: Arc<dyn HealthTransport>,
    settings: ValidatorSettings,
}

struct Checks {
    status: ValidationStatus,
    dns: OwnershipCheck,
    https: Option<ProbeResult>,
}

impl Validator {
    pub fn new(
        registry: Arc<dyn SiteRegistry>,
        dns: Arc<dyn DnsLookup>,
        transport: Arc<dyn HealthTransport>,
        settings: ValidatorSettings,
    ) -> Self {
        Self {
            registry,
            dns,
            transport,
            settings,
        }
    }

    pub fn expected_target(&self) -> Option<&str> {
        self.settings.expected_target.as_deref()
    }

    /// Runs one validation for `site` and persists the outcome.
    ///
    /// `last_checked_at` is written first and independently of the status.
    /// Registry failures do not escape: they become `error_generic`.
    pub async fn validate(&self, site: &Site) -> Result<ValidationOutcome, ValidateError> {
        if domain::is_reserved(&site.domain, &self.settings.reserved_domain) {
            return Err(ValidateError::ReservedDomain(site.domain.clone()));
        }

        let checked_at = OffsetDateTime::now_utc();
        let outcome = match self.run(site, checked_at).await {
            Ok(checks) => self.describe(site, checked_at, checks),
            Err(e) => {
                error!(site_id = site.id, domain = %site.domain, error = ?e, "domain validation fault");
                if let Err(write_err) = self
                    .registry
                    .update_status(site.id, ValidationStatus::ErrorGeneric)
                    .await
                {
                    error!(site_id = site.id, error = %write_err, "could not record error_generic status");
                }
                ValidationOutcome {
                    site_id: site.id,
                    domain: site.domain.clone(),
                    status: ValidationStatus::ErrorGeneric,
                    level: NoticeLevel::Error,
                    message: format!(
                        "Validation of {} failed unexpectedly. Please try again later.",
                        site.domain
                    ),
                    checked_at,
                    dns: None,
                    https: None,
                }
            }
        };

        info!(
            site_id = site.id,
            domain = %site.domain,
            status = %outcome.status,
            "domain validation finished"
        );
        Ok(outcome)
    }

    async fn run(&self, site: &Site, checked_at: OffsetDateTime) -> anyhow::Result<Checks> {
        self.registry
            .update_last_checked_at(site.id, checked_at)
            .await
            .context("record last_checked_at")?;

        let ownership =
            dns::resolve_ownership(self.dns.as_ref(), &site.domain, self.expected_target()).await;
        if !ownership.ok {
            warn!(domain = %site.domain, method = ?ownership.method, detail = %ownership.detail, "dns ownership check failed");
            self.registry
                .update_status(site.id, ValidationStatus::DnsError)
                .await
                .context("record dns_error")?;
            return Ok(Checks {
                status: ValidationStatus::DnsError,
                dns: ownership,
                https: None,
            });
        }

        let health =
            probe::probe_health(self.transport.as_ref(), &site.domain, self.settings.probe).await;
        let status = if health.ok {
            ValidationStatus::Active
        } else {
            ValidationStatus::DnsOkTlsError
        };
        self.registry
            .update_status(site.id, status)
            .await
            .with_context(|| format!("record {status}"))?;

        Ok(Checks {
            status,
            dns: ownership,
            https: Some(health),
        })
    }

    fn describe(&self, site: &Site, checked_at: OffsetDateTime, checks: Checks) -> ValidationOutcome {
        let (level, message) = match (&checks.status, &checks.https) {
            (ValidationStatus::Active, _) => (
                NoticeLevel::Success,
                format!("{} is active. DNS and HTTPS are correctly configured.", site.domain),
            ),
            (ValidationStatus::DnsOkTlsError, Some(https)) => (
                NoticeLevel::Warning,
                format!(
                    "DNS for {} is correct, but the HTTPS check failed: {}",
                    site.domain, https.detail
                ),
            ),
            _ => match self.expected_target() {
                Some(target) => (
                    NoticeLevel::Error,
                    format!(
                        "DNS for {} does not point to {target}: {}. Create a CNAME record pointing to {target}.",
                        site.domain, checks.dns.detail
                    ),
                ),
                None => (
                    NoticeLevel::Error,
                    format!(
                        "{} cannot be validated yet: the platform CNAME target is not configured. \
                         Contact the platform operator.",
                        site.domain
                    ),
                ),
            },
        };
        ValidationOutcome {
            site_id: site.id,
            domain: site.domain.clone(),
            status: checks.status,
            level,
            message,
            checked_at,
            dns: Some(checks.dns),
            https: checks.https,
        }
    }
}
