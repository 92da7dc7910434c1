//! HTTPS liveness and identity probe against `https://<domain>/health`.
use crate::domain::normalize_host;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Header the platform sets on its own `/health` responses.
pub const SIGNATURE_HEADER: &str = "x-sms-sites";
pub const SIGNATURE_VALUE: &str = "1";
pub const HEALTH_PATH: &str = "/health";
/// Body bytes kept from a probe response.
pub const BODY_PREFIX_LIMIT: usize = 64;

pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// What one probe attempt observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: u16,
    pub signature: Option<String>,
    pub body_prefix: Vec<u8>,
}

/// One HTTPS GET of the health path with SNI set to `domain`. Transport
/// failures come back as `Err` and are turned into failed attempts by
/// [`probe_health`].
#[async_trait]
pub trait HealthTransport: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<HealthResponse>;
}

/// `reqwest` over rustls. The URL host is the candidate domain, so rustls
/// sends it as SNI and verifies the certificate against it.
pub struct HttpsTransport {
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .https_only(true)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .context("build https probe client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthTransport for HttpsTransport {
    async fn fetch(&self, domain: &str) -> Result<HealthResponse> {
        let url = format!("https://{domain}:443{HEALTH_PATH}");
        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status().as_u16();
        let signature = response
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body_prefix = Vec::with_capacity(BODY_PREFIX_LIMIT);
        while let Some(chunk) = response.chunk().await.context("read health body")? {
            if append_capped(&mut body_prefix, &chunk, BODY_PREFIX_LIMIT) {
                break;
            }
        }

        Ok(HealthResponse {
            status,
            signature,
            body_prefix,
        })
    }
}

/// Appends as much of `chunk` as fits under `limit`. Returns `true` once the
/// buffer is full and the rest of the body should be left unread.
pub fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let take = limit.saturating_sub(buf.len()).min(chunk.len());
    buf.extend_from_slice(&chunk[..take]);
    buf.len() >= limit
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub ok: bool,
    pub detail: String,
}

/// Judges a single response: status 200 plus either the signature header or
/// a body that trims to exactly `OK`.
pub fn assess(response: &HealthResponse) -> ProbeResult {
    if response.status != 200 {
        return ProbeResult {
            ok: false,
            detail: format!("{HEALTH_PATH} returned HTTP {}", response.status),
        };
    }
    let signed = response.signature.as_deref().map(str::trim) == Some(SIGNATURE_VALUE);
    let body_ok = String::from_utf8_lossy(&response.body_prefix).trim() == "OK";
    if signed || body_ok {
        ProbeResult {
            ok: true,
            detail: format!("{HEALTH_PATH} returned 200 with platform signature"),
        }
    } else {
        ProbeResult {
            ok: false,
            detail: format!(
                "{HEALTH_PATH} returned 200 but without the platform signature; \
                 the domain is reachable but not served by this platform"
            ),
        }
    }
}

/// Probes `domain` up to `1 + retries` times, sleeping `retry_delay` between
/// attempts, and returns the first success or the last failure.
pub async fn probe_health(
    transport: &dyn HealthTransport,
    domain: &str,
    options: ProbeOptions,
) -> ProbeResult {
    let domain = normalize_host(domain);
    let attempts = options.retries.saturating_add(1);
    let mut last = ProbeResult {
        ok: false,
        detail: "no probe attempted".to_string(),
    };

    for attempt in 1..=attempts {
        last = match transport.fetch(&domain).await {
            Ok(response) => assess(&response),
            Err(e) => ProbeResult {
                ok: false,
                detail: format!("HTTPS request failed: {e:#}"),
            },
        };
        if last.ok {
            debug!(domain = %domain, attempt, "health probe succeeded");
            return last;
        }
        warn!(domain = %domain, attempt, detail = %last.detail, "health probe attempt failed");
        if attempt < attempts {
            tokio::time::sleep(options.retry_delay).await;
        }
    }
    last
}
