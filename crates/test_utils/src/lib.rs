//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the inventory
//! ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built items, dates and prices
//! - `builders`: Document builder and store seeder
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for balances, costs and posting errors
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
