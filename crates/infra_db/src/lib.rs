//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the inventory ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: `repositories` hold the SQL and
//! row mapping, `adapters` implement the domain's `LedgerStore` port on top
//! of them. Schema migrations live in the workspace `migrations/` directory
//! and are embedded into the binary.
//!
//! # Concurrency
//!
//! A posting runs in one `READ COMMITTED` transaction and serializes with
//! other postings through row locks taken in a fixed order: the document
//! row, then item rows, then balance rows. Every pooled connection carries a
//! `lock_timeout`, so a blocked posting fails fast with a retriable conflict.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/inventory")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PostgresLedgerStore, PostgresLedgerTransaction};
