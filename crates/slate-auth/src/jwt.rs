//! Access token creation and verification (HS256).

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use slate_config::JwtConfig;
use slate_core::AppError;
use slate_models::Principal;

use crate::claims::Claims;

/// Issues an access token for `principal`, valid for
/// `jwt_config.access_token_expiry` seconds.
pub fn create_access_token(principal: &Principal, jwt_config: &JwtConfig) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry.max(0) as usize;

    let claims = Claims {
        sub: principal.id,
        email: principal.email.clone(),
        role: principal.role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {e}")))
}

/// Verifies signature and expiry. Any failure is `UNAUTHENTICATED`.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}
