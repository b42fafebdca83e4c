/// Authentication middleware
use crate::{error::ServerError, state::AppState};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use clinic_core::Identity;

/// Extension type to store the authenticated caller in the request
/// Can be used as an extractor in handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

/// Middleware that validates the Bearer JWT and loads the caller's account
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ServerError::Auth("Authentication credentials were not provided.".to_string())
        })?;

    // Check Bearer prefix
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServerError::Auth("Expected a Bearer token.".to_string()))?;

    // Verify token
    let user_id = app_state
        .auth_service
        .verify_access_token(token)
        .map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            ServerError::Auth("Invalid token".to_string())
        })?;

    // Role and superuser flag come from the current row, not the token
    let user = clinic_storage::users::get_by_id(&app_state.pool, user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Token subject no longer exists");
            ServerError::Auth("User not found".to_string())
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(user.identity()));

    Ok(next.run(request).await)
}

/// Implement FromRequestParts so AuthenticatedUser can be used as an extractor
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| ServerError::Auth("Not authenticated".to_string()))
    }
}
