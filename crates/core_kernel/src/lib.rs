//! Core Kernel - Foundational types and utilities for the inventory ledger
//!
//! This crate provides the fundamental building blocks used by the posting engine
//! and its adapters:
//! - Money type with precise decimal arithmetic and explicit rounding
//! - Strongly-typed identifiers for documents, lines, items and counterparties
//! - Port error types shared by storage adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, MoneyError, Rate, MONEY_DECIMAL_PLACES};
pub use identifiers::{DocumentId, DocumentLineId, NomenclatureId, CounterpartyId};
pub use error::CoreError;
pub use ports::{DomainPort, PortError};
