use crate::api::AppState;
use crate::api::SESSION_HEADER;
use crate::api::error::{ApiError, api_conflict, api_validation_error};
use crate::domain;
use crate::model::{Site, SiteId};
use crate::notice::Notice;
use crate::validate::{ValidateError, ValidationOutcome};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub domain: String,
}

fn session_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub async fn list_sites(State(state): State<AppState>) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.registry.list().await?))
}

pub async fn get_site(
    State(state): State<AppState>,
    Path(id): Path<SiteId>,
) -> Result<Json<Site>, ApiError> {
    Ok(Json(state.registry.get(id).await?))
}

pub async fn create_site(
    State(state): State<AppState>,
    Json(request): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    let host = domain::canonical_host(&request.domain);
    if !domain::is_registrable(&host) {
        return Err(api_validation_error(&format!(
            "{:?} is not a valid domain name",
            request.domain
        )));
    }
    let site = state.registry.create_site(&host).await?;
    tracing::info!(site_id = site.id, domain = %site.domain, "site registered");
    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn delete_site(
    State(state): State<AppState>,
    Path(id): Path<SiteId>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete_site(id).await?;
    tracing::info!(site_id = id, "site deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Runs one validation. The outcome is returned and also queued as a notice
/// for the caller's session, if one was sent.
pub async fn validate_site(
    State(state): State<AppState>,
    Path(id): Path<SiteId>,
    headers: HeaderMap,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let site = state.registry.get(id).await?;
    let outcome = state
        .validator
        .validate(&site)
        .await
        .map_err(|e| match e {
            ValidateError::ReservedDomain(_) => api_conflict("reserved_domain", &e.to_string()),
        })?;
    if let Some(session) = session_key(&headers) {
        state.notices.push(
            session,
            Notice {
                level: outcome.level,
                message: outcome.message.clone(),
            },
        );
    }
    Ok(Json(outcome))
}

pub async fn take_notices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notice>>, ApiError> {
    let session = session_key(&headers)
        .ok_or_else(|| api_validation_error(&format!("missing {SESSION_HEADER} header")))?;
    Ok(Json(state.notices.take(session)))
}
