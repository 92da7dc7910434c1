#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use sitegate::api::{AppState, build_router};
use sitegate::dns::DnsLookup;
use sitegate::gatekeeper::Gatekeeper;
use sitegate::notice::NoticeBoard;
use sitegate::probe::{HealthResponse, HealthTransport, ProbeOptions};
use sitegate::registry::SiteRegistry;
use sitegate::registry::memory::InMemoryRegistry;
use sitegate::validate::{Validator, ValidatorSettings};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const TARGET: &str = "proxy.platform.test";
pub const TOKEN: &str = "ask-token";
pub const RESERVED: &str = "default";

#[derive(Default)]
pub struct ZoneDns {
    pub cnames: HashMap<String, Vec<String>>,
    pub a: HashMap<String, Vec<IpAddr>>,
}

#[async_trait]
impl DnsLookup for ZoneDns {
    async fn cname(&self, name: &str) -> Vec<String> {
        self.cnames.get(name).cloned().unwrap_or_default()
    }

    async fn ipv4(&self, name: &str) -> Vec<IpAddr> {
        self.a.get(name).cloned().unwrap_or_default()
    }

    async fn ipv6(&self, _name: &str) -> Vec<IpAddr> {
        Vec::new()
    }
}

pub fn cname_zone(domain: &str, target: &str) -> ZoneDns {
    let mut zone = ZoneDns::default();
    zone.cnames
        .insert(domain.to_string(), vec![format!("{target}.")]);
    zone
}

/// Answers every probe with the same response and counts calls.
pub struct FixedHealth {
    pub response: HealthResponse,
    pub calls: AtomicUsize,
}

impl FixedHealth {
    pub fn new(status: u16, signature: Option<&str>, body: &str) -> Self {
        Self {
            response: HealthResponse {
                status,
                signature: signature.map(str::to_string),
                body_prefix: body.as_bytes().to_vec(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthTransport for FixedHealth {
    async fn fetch(&self, _domain: &str) -> anyhow::Result<HealthResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub registry: Arc<InMemoryRegistry>,
    pub health: Arc<FixedHealth>,
}

pub fn test_app(dns: ZoneDns, health: FixedHealth) -> TestApp {
    let registry = Arc::new(InMemoryRegistry::new(RESERVED));
    let health = Arc::new(health);
    let shared: Arc<dyn SiteRegistry> = registry.clone();
    let validator = Validator::new(
        shared.clone(),
        Arc::new(dns),
        health.clone(),
        ValidatorSettings {
            expected_target: Some(TARGET.to_string()),
            reserved_domain: RESERVED.to_string(),
            probe: ProbeOptions {
                retries: 2,
                retry_delay: Duration::from_millis(1),
            },
        },
    );
    let state = AppState {
        registry: shared.clone(),
        validator: Arc::new(validator),
        gatekeeper: Arc::new(Gatekeeper::new(TOKEN, RESERVED, shared)),
        notices: Arc::new(NoticeBoard::new()),
    };
    TestApp {
        router: build_router(state),
        registry,
        health,
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
