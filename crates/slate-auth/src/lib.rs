//! # Slate Auth
//!
//! JWT claims and token utilities for the Slate API.
//!
//! - [`claims`]: access token claims
//! - [`jwt`]: token creation and verification
//!
//! The token only proves identity. The role carried in the claims is a hint
//! for clients; authorization always uses the principal loaded from the store.
//!
//! # Example
//!
//! ```ignore
//! use slate_auth::{create_access_token, verify_token};
//! use slate_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(&principal, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
