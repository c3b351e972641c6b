//! # Slate DB
//!
//! Persistence for the Slate API.
//!
//! - [`store`]: the [`SchoolStore`] and [`AuditSink`] traits the services depend on
//! - [`postgres`]: [`PgStore`], the sqlx/PostgreSQL implementation
//! - [`memory`]: [`MemoryStore`], an in-process implementation for tests and local runs
//! - [`errors`]: mapping of sqlx errors onto the application error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use slate_db::{PgStore, init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&database_url).await?;
//! run_migrations(&pool).await?;
//! let store = PgStore::new(pool);
//! ```

pub mod errors;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use pool::{init_db_pool, run_migrations};
pub use postgres::PgStore;
pub use store::{AuditSink, SchoolStore};

// Re-export PgPool for convenience
pub use sqlx::PgPool;
