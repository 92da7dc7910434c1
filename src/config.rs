use crate::domain;
use crate::gatekeeper;
use crate::probe::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT, ProbeOptions};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_RESERVED_DOMAIN: &str = "default";

// Service configuration sourced from environment variables, fixed for the
// lifetime of the process.
#[derive(Debug, Clone)]
pub struct SitesConfig {
    pub bind_addr: SocketAddr,
    pub expected_cname: Option<String>,
    pub ask_token: String,
    pub reserved_domain: String,
    pub probe_retries: u32,
    pub probe_retry_delay: Duration,
    pub probe_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct SitesConfigOverride {
    bind_addr: Option<String>,
    expected_cname: Option<String>,
    ask_token: Option<String>,
    reserved_domain: Option<String>,
    probe_retries: Option<u32>,
    probe_retry_delay_ms: Option<u64>,
    probe_timeout_ms: Option<u64>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_nonempty(key) {
        Some(value) => value.parse().with_context(|| format!("parse {key}")),
        None => Ok(default),
    }
}

/// Stores the reserved domain in the same canonical form the registry keys
/// on. Anything that is not a plain hostname after canonicalization is
/// refused rather than silently never matching.
fn canonical_reserved_domain(raw: &str) -> Result<String> {
    let host = domain::canonical_host(raw);
    if !domain::has_hostname_charset(&host) || domain::is_ipv4_literal(&host) {
        bail!("reserved domain {raw:?} is not a valid hostname");
    }
    Ok(host)
}

impl SitesConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_nonempty("SITES_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse SITES_BIND")?;
        let reserved_domain = canonical_reserved_domain(
            &env_nonempty("SITES_DEFAULT_DOMAIN").unwrap_or_else(|| DEFAULT_RESERVED_DOMAIN.to_string()),
        )
        .context("parse SITES_DEFAULT_DOMAIN")?;
        let probe_retries = env_parse("SITES_PROBE_RETRIES", DEFAULT_RETRIES)?;
        let probe_retry_delay = Duration::from_millis(env_parse(
            "SITES_PROBE_RETRY_DELAY_MS",
            DEFAULT_RETRY_DELAY.as_millis() as u64,
        )?);
        let probe_timeout = Duration::from_millis(env_parse(
            "SITES_PROBE_TIMEOUT_MS",
            DEFAULT_TIMEOUT.as_millis() as u64,
        )?);
        Ok(Self {
            bind_addr,
            expected_cname: env_nonempty("SITES_EXPECTED_CNAME"),
            ask_token: env_nonempty("SITES_ASK_TOKEN").unwrap_or_default(),
            reserved_domain,
            probe_retries,
            probe_retry_delay,
            probe_timeout,
        })
    }

    /// Env first, then the YAML file named by `SITES_CONFIG` overrides any
    /// field it sets. An empty token is replaced by a random one.
    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = env_nonempty("SITES_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read SITES_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        config.ensure_token();
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: SitesConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse sites config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.expected_cname {
            self.expected_cname = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = override_cfg.ask_token {
            self.ask_token = value;
        }
        if let Some(value) = override_cfg.reserved_domain {
            self.reserved_domain = canonical_reserved_domain(&value).context("parse reserved_domain")?;
        }
        if let Some(value) = override_cfg.probe_retries {
            self.probe_retries = value;
        }
        if let Some(value) = override_cfg.probe_retry_delay_ms {
            self.probe_retry_delay = Duration::from_millis(value);
        }
        if let Some(value) = override_cfg.probe_timeout_ms {
            self.probe_timeout = Duration::from_millis(value);
        }
        Ok(())
    }

    fn ensure_token(&mut self) {
        if self.ask_token.trim().is_empty() {
            warn!("SITES_ASK_TOKEN not set; certificate issuance checks will refuse every request");
            self.ask_token = gatekeeper::generate_secret();
        }
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            retries: self.probe_retries,
            retry_delay: self.probe_retry_delay,
        }
    }
}
