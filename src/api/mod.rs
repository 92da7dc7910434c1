//! HTTP surface: platform health signature, the on-demand TLS "ask" hook,
//! site registration and the validation trigger.
use crate::gatekeeper::Gatekeeper;
use crate::notice::NoticeBoard;
use crate::registry::SiteRegistry;
use crate::validate::Validator;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod sites;
pub mod system;

/// Header carrying the caller's session key for one-time notices.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn SiteRegistry>,
    pub validator: Arc<Validator>,
    pub gatekeeper: Arc<Gatekeeper>,
    pub notices: Arc<NoticeBoard>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        });

    Router::new()
        .route("/health", get(system::health))
        .route("/tls/ask", get(system::tls_ask))
        .route("/notices", get(sites::take_notices))
        .route("/sites", get(sites::list_sites).post(sites::create_site))
        .route("/sites/:id", get(sites::get_site).delete(sites::delete_site))
        .route("/sites/:id/validate", post(sites::validate_site))
        .layer(trace_layer)
        .with_state(state)
}
