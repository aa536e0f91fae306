//! Registry search endpoints.
//!
//! `/api/search` is gated by the session cookie and uses exact matching;
//! `/look_for` is gated by the shared lookup token and uses substring
//! matching. Both filter only the fetched page and report the registry's own
//! `count`.

use super::{pages, state::AuthState};
use crate::registry::{BankRecord, FilterSet, MatchPolicy, RegistryClient, RegistryError};
use axum::{
    extract::{Extension, Query},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use utoipa::{IntoParams, ToSchema};

pub const SEARCH_DEFAULT_LIMIT: u64 = 10;
pub const LOOKUP_DEFAULT_LIMIT: u64 = 100;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("Failed to fetch registry data")]
    Upstream(#[from] RegistryError),
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Unauthorized")),
            )
                .into_response(),
            Self::Validation(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse::new(&message)),
            )
                .into_response(),
            Self::Upstream(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    detail: "Failed to fetch registry data".to_string(),
                    error: Some(err.to_string()),
                }),
            )
                .into_response(),
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SearchResponse {
    /// Total reported by the registry for the requested page parameters.
    count: u64,
    #[schema(value_type = Vec<Object>)]
    data: Vec<BankRecord>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorResponse {
    fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
            error: None,
        }
    }
}

/// Filter columns accepted by both search endpoints, for the `OpenAPI` document.
#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "UPPERCASE")]
#[allow(dead_code)]
pub struct BankColumns {
    bank_id: Option<String>,
    bank_type: Option<String>,
    region_id: Option<String>,
    header_id: Option<String>,
    union_id: Option<String>,
    tcc_id: Option<String>,
    ccc_id: Option<String>,
    bank_name: Option<String>,
    bank_adres: Option<String>,
    bank_statu: Option<String>,
    date_open: Option<String>,
    date_close: Option<String>,
    active: Option<String>,
    date_act: Option<String>,
    date_deact: Option<String>,
    distr: Option<String>,
    kol_obm: Option<String>,
    inn: Option<String>,
}

/// Session-gated search with exact, case-insensitive column matching.
#[instrument(skip_all)]
pub async fn search(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    registry: Extension<Arc<RegistryClient>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResponse>, SearchError> {
    if !auth_state.sessions().state(&headers).is_authenticated() {
        return Err(SearchError::Unauthorized);
    }

    let (offset, limit) = paging(&params, SEARCH_DEFAULT_LIMIT)?;
    filtered_page(&registry, &params, offset, limit, MatchPolicy::Exact).await
}

#[utoipa::path(
    get,
    path = "/look_for",
    params(
        ("access_token" = String, Query, description = "Shared lookup token"),
        ("offset" = Option<u64>, Query, description = "Registry offset (default 0)"),
        ("limit" = Option<u64>, Query, description = "Registry page size (default 100)"),
        BankColumns
    ),
    responses(
        (status = 200, description = "Filtered page; count is the registry total", body = SearchResponse),
        (status = 401, description = "Lookup token mismatch", body = ErrorResponse),
        (status = 422, description = "Missing token or invalid paging", body = ErrorResponse),
        (status = 500, description = "Registry unavailable", body = ErrorResponse)
    ),
    tag = "Search"
)]
/// Token-gated lookup with substring, case-insensitive column matching.
#[instrument(skip_all)]
pub async fn look_for(
    auth_state: Extension<Arc<AuthState>>,
    registry: Extension<Arc<RegistryClient>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResponse>, SearchError> {
    let Some(token) = params.get("access_token") else {
        return Err(SearchError::Validation(
            "Missing required query parameter: access_token".to_string(),
        ));
    };
    if !auth_state.lookup_token().permits(token) {
        warn!("Lookup rejected: access token mismatch");
        return Err(SearchError::Unauthorized);
    }

    let (offset, limit) = paging(&params, LOOKUP_DEFAULT_LIMIT)?;
    filtered_page(&registry, &params, offset, limit, MatchPolicy::Substring).await
}

/// HTML search page; anonymous visitors are sent to the login page.
pub async fn search_page(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    match auth_state.sessions().state(&headers).user() {
        Some(user) => Html(pages::search(user)).into_response(),
        None => (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/login"))]).into_response(),
    }
}

async fn filtered_page(
    registry: &RegistryClient,
    params: &HashMap<String, String>,
    offset: u64,
    limit: u64,
    policy: MatchPolicy,
) -> Result<Json<SearchResponse>, SearchError> {
    let page = registry.fetch(offset, limit).await?;

    let filters = FilterSet::from_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let fetched = page.rows.len();
    let data = filters.apply(page.rows, policy);
    debug!(
        fetched,
        kept = data.len(),
        filters = filters.len(),
        "registry page filtered"
    );

    Ok(Json(SearchResponse {
        count: page.total_count,
        data,
    }))
}

fn paging(params: &HashMap<String, String>, default_limit: u64) -> Result<(u64, u64), SearchError> {
    let offset = parse_param(params, "offset", 0)?;
    let limit = parse_param(params, "limit", default_limit)?;
    if limit == 0 {
        return Err(SearchError::Validation(
            "limit must be greater than 0".to_string(),
        ));
    }
    Ok((offset, limit))
}

fn parse_param(params: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, SearchError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            SearchError::Validation(format!(
                "{name} must be a non-negative integer, got {value:?}"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn paging_defaults() {
        assert!(matches!(paging(&params(&[]), 10), Ok((0, 10))));
        assert!(matches!(paging(&params(&[]), 100), Ok((0, 100))));
        assert!(matches!(
            paging(&params(&[("offset", "20"), ("limit", "5")]), 10),
            Ok((20, 5))
        ));
    }

    #[test]
    fn paging_rejects_invalid_values() {
        for bad in [
            params(&[("offset", "-1")]),
            params(&[("offset", "ten")]),
            params(&[("limit", "0")]),
            params(&[("limit", "")]),
        ] {
            assert!(matches!(paging(&bad, 10), Err(SearchError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn upstream_error_keeps_underlying_text() -> anyhow::Result<()> {
        let err = SearchError::from(RegistryError::UpstreamUnavailable("timed out".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let payload: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(payload["detail"], json!("Failed to fetch registry data"));
        assert_eq!(payload["error"], json!("timed out"));
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_body_has_detail_only() -> anyhow::Result<()> {
        let response = SearchError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let payload: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(payload, json!({"detail": "Unauthorized"}));
        Ok(())
    }
}
