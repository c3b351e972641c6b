//! Request extractors.
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. [`AuthUser`](auth::AuthUser) verifies the JWT and loads the principal
//! 3. The handler's service call asks the authorization engine for a decision
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//!
//! async fn get_student(State(state): State<AppState>, auth_user: AuthUser) -> ... {
//!     StudentService::get_student(&state, auth_user.principal(), id).await
//! }
//! ```

pub mod auth;
pub mod rate_limit;
