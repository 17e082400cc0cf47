//! Domain Adapters
//!
//! Implementations of the domain's port traits on top of the repository
//! layer. Adapters translate `DatabaseError` into `PortError`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_inventory::LedgerStore;
//!
//! let store = PostgresLedgerStore::new(pool);
//! let balances = store.list_balances().await?;
//! ```

pub mod ledger;

pub use ledger::{PostgresLedgerStore, PostgresLedgerTransaction};
