use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::error::{validation, AppError, AppResult, OptionExt};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::types::{AddCredentialRequest, ApiUrlQuery, Credential, MessageResponse};

pub async fn add_credential(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddCredentialRequest>,
) -> AppResult<(StatusCode, Json<Credential>)> {
    let title = validation::api_title(req.api_title.as_deref())?;
    let token = validation::api_token(req.api_url.as_deref())?;
    let credential = state.credentials.add(user, &title, &token).await?;
    tracing::info!(%user, credential_id = credential.id, "credential linked");
    Ok((StatusCode::CREATED, Json(credential)))
}

pub async fn list_credentials(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Credential>>> {
    Ok(Json(state.credentials.list(user).await?))
}

pub async fn delete_credential(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ApiUrlQuery>,
) -> AppResult<Json<MessageResponse>> {
    if state.credentials.delete(user, &query.api_url).await? {
        Ok(Json(MessageResponse::new("credential deleted")))
    } else {
        Err(AppError::CredentialNotFound("no such credential for this user".to_string()))
    }
}

/// Sets `isConnected` without contacting the provider.
pub async fn connect_credential(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ApiUrlQuery>,
) -> AppResult<Json<Credential>> {
    if !state.credentials.set_connected(user, &query.api_url, true).await? {
        return Err(AppError::CredentialNotFound("no such credential for this user".to_string()));
    }
    let credential = state.credentials.find(user, &query.api_url).await?.ok_or_credential_not_found()?;
    Ok(Json(credential))
}
