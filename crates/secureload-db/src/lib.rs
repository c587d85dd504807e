//! # SecureLoad DB
//!
//! The local identity mirror: users, groups (roles) and permissions.
//!
//! - [`IdentityStore`]: the storage seam used by the HTTP layer and the
//!   authentication middleware
//! - [`PgIdentityStore`]: PostgreSQL implementation (schema in
//!   `schema.sql` at the crate root)
//! - [`MemoryIdentityStore`]: in-process implementation used when no
//!   database is configured and in tests
//!
//! # Example
//!
//! ```ignore
//! use secureload_db::{init_db_pool, PgIdentityStore};
//!
//! let pool = init_db_pool(&database_url).await?;
//! let store = PgIdentityStore::new(pool);
//! ```

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;
pub use store::{IdentityStore, StoreError};

// Re-export sqlx for convenience
pub use sqlx::{self, PgPool};

/// Opens a PostgreSQL connection pool.
///
/// Called once at startup; the pool is cheaply cloneable and owned by the
/// [`PgIdentityStore`] shared through application state.
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
