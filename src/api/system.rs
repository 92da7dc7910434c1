use crate::api::AppState;
use crate::probe::{SIGNATURE_HEADER, SIGNATURE_VALUE};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

/// The platform's own liveness answer; the prober looks for exactly this.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, [(SIGNATURE_HEADER, SIGNATURE_VALUE)], "OK")
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    domain: Option<String>,
    token: Option<String>,
}

/// On-demand TLS authorization hook. Bare 200 or 403; no body contract.
pub async fn tls_ask(State(state): State<AppState>, Query(params): Query<AskParams>) -> StatusCode {
    let (Some(domain), Some(token)) = (params.domain, params.token) else {
        return StatusCode::FORBIDDEN;
    };
    if state.gatekeeper.should_issue_certificate(&domain, &token).await {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}
