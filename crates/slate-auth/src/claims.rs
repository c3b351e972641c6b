//! JWT claim structures.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use slate_models::{PrincipalId, Role};

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Principal id (subject claim)
    pub sub: PrincipalId,
    pub email: String,
    /// Role at issue time
    pub role: Role,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}
