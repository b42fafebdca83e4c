/// Authentication API routes
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

fn invalid_credentials() -> ServerError {
    ServerError::Auth("Invalid username or password".to_string())
}

/// POST /api/auth/token
pub async fn obtain_token(
    State(app_state): State<AppState>,
    payload: std::result::Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(req) = payload?;

    let user = clinic_storage::users::find_by_username(&app_state.pool, &req.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    // Accounts without a stored hash cannot log in
    let password_hash = clinic_storage::users::get_password_hash(&app_state.pool, user.id)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !app_state
        .auth_service
        .verify_password(&req.password, &password_hash)?
    {
        tracing::warn!(username = %req.username, "Rejected login");
        return Err(invalid_credentials());
    }

    let access_token = app_state.auth_service.create_access_token(user.id)?;
    let refresh_token = app_state.auth_service.create_refresh_token(user.id)?;

    tracing::info!(user_id = %user.id, "Issued tokens");
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
    }))
}

/// POST /api/auth/token/refresh
pub async fn refresh_token(
    State(app_state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(req) = payload?;

    let user_id = app_state
        .auth_service
        .verify_refresh_token(&req.refresh_token)?;

    if clinic_storage::users::get_by_id(&app_state.pool, user_id)
        .await?
        .is_none()
    {
        return Err(ServerError::Auth("User not found".to_string()));
    }

    let access_token = app_state.auth_service.create_access_token(user_id)?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
    }))
}
