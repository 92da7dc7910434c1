use anyhow::Context;
use sitegate::api::{AppState, build_router};
use sitegate::config::SitesConfig;
use sitegate::dns::SystemDns;
use sitegate::gatekeeper::Gatekeeper;
use sitegate::notice::NoticeBoard;
use sitegate::observability;
use sitegate::probe::HttpsTransport;
use sitegate::registry::SiteRegistry;
use sitegate::registry::memory::InMemoryRegistry;
use sitegate::validate::{Validator, ValidatorSettings};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();
    let config = SitesConfig::from_env_or_yaml().context("load sites config")?;
    if config.expected_cname.is_none() {
        tracing::warn!("SITES_EXPECTED_CNAME not set; no domain can pass the DNS check");
    }

    let state = build_state(&config)?;
    let app = build_router(state);

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, expected_cname = ?config.expected_cname, "sitegate listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn build_state(config: &SitesConfig) -> anyhow::Result<AppState> {
    let registry: Arc<dyn SiteRegistry> =
        Arc::new(InMemoryRegistry::new(&config.reserved_domain));
    let transport = HttpsTransport::new(config.probe_timeout)?;
    let validator = Validator::new(
        registry.clone(),
        Arc::new(SystemDns::new()),
        Arc::new(transport),
        ValidatorSettings {
            expected_target: config.expected_cname.clone(),
            reserved_domain: config.reserved_domain.clone(),
            probe: config.probe_options(),
        },
    );
    let gatekeeper = Gatekeeper::new(
        &config.ask_token,
        &config.reserved_domain,
        registry.clone(),
    );
    Ok(AppState {
        registry,
        validator: Arc::new(validator),
        gatekeeper: Arc::new(gatekeeper),
        notices: Arc::new(NoticeBoard::new()),
    })
}
