use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{validation, AppResult};
use crate::middleware::ip::{extract_ip_from_headers, MaybeRemoteAddr};
use crate::middleware::CurrentUser;
use crate::response::{self, FAILED_CREDENTIALS_HEADER};
use crate::state::{AppState, DRIVE_CONNECT_ENDPOINT, DRIVE_LOAD_ENDPOINT};
use crate::types::{ApiUrlQuery, Credential, DriveNode};

/// Full drive tree for one token. Marks the caller's matching credential as connected.
pub async fn connect_drive(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    maybe_remote: MaybeRemoteAddr,
    headers: HeaderMap,
    Query(query): Query<ApiUrlQuery>,
) -> AppResult<Json<Vec<DriveNode>>> {
    let ip = extract_ip_from_headers(&headers, maybe_remote.0.map(|a| a.ip()));
    state.rate_limiter.check_endpoint_limit(DRIVE_CONNECT_ENDPOINT, ip).await?;

    let token = validation::api_token(Some(&query.api_url))?;
    let drives = state.aggregator.fetch_single(&token).await?;

    if !state.credentials.set_connected(user, &token, true).await? {
        tracing::debug!(%user, "fetched tree for a token that is not linked to the user");
    }
    Ok(Json(drives))
}

pub async fn disconnect_drive(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ApiUrlQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let token = validation::api_token(Some(&query.api_url))?;
    let disconnected = state.credentials.set_connected(user, &token, false).await?;
    Ok(Json(json!({ "disconnected": disconnected })))
}

/// Aggregated trees of every connected credential of the caller.
///
/// Always one entry per connected credential; failed ones carry an `error` marker and the
/// failure count is repeated in the `x-drivehub-failed-credentials` header.
pub async fn load_drives(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    maybe_remote: MaybeRemoteAddr,
    headers: HeaderMap,
) -> AppResult<Response> {
    let ip = extract_ip_from_headers(&headers, maybe_remote.0.map(|a| a.ip()));
    state.rate_limiter.check_endpoint_limit(DRIVE_LOAD_ENDPOINT, ip).await?;

    let aggregation = state.aggregator.aggregate_for_user(state.credentials.as_ref(), user).await?;
    let failed = aggregation.failed();

    let mut res = Json(response::assemble(aggregation)).into_response();
    if failed > 0 {
        res.headers_mut().insert(HeaderName::from_static(FAILED_CREDENTIALS_HEADER), HeaderValue::from(failed));
    }
    Ok(res)
}

pub async fn connected_credentials(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Credential>>> {
    Ok(Json(state.credentials.list_connected(user).await?))
}
