//! Repository implementations
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! domain types. They report failures as `DatabaseError`.

pub mod ledger;

pub use ledger::LedgerRepository;
