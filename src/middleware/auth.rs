use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use slate_auth::verify_token;
use slate_cache::keys::principals;
use slate_core::AppError;
use slate_models::{Principal, PrincipalId, Role};
use tracing::{debug, warn};

use crate::state::AppState;

/// Extractor that validates the bearer token and loads the acting principal.
///
/// The token only identifies the caller. Role and active flag come from the
/// stored principal, so a role change or deactivation applies to tokens that
/// are already out.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    pub fn id(&self) -> PrincipalId {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))
}

async fn load_principal(state: &AppState, id: PrincipalId) -> Result<Principal, AppError> {
    let key = principals::by_id(id.into_inner());

    if let Some(cache) = &state.cache
        && let Some(principal) = cache.get::<Principal>(&key).await
    {
        debug!(principal.id = %id, "Principal found in cache");
        return Ok(principal);
    }

    let principal = state
        .store
        .find_principal(id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Principal no longer exists"))?;

    if let Some(cache) = &state.cache
        && let Err(e) = cache.set_with_ttl(&key, &principal, principals::TTL).await
    {
        warn!(error = %e, "Failed to cache principal");
    }

    Ok(principal)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_token(token, &state.jwt_config)?;
        let principal = load_principal(state, claims.sub).await?;

        Ok(AuthUser(principal))
    }
}
