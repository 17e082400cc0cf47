//! Inventory Domain - Document Posting Engine
//!
//! This crate turns unposted stock documents (purchases, sales) into durable
//! changes of per-item balances. Posting a document:
//!
//! - classifies its operation type as inbound or outbound stock movement
//! - adds inbound lines to the `(item, account)` balance at their net value
//! - costs outbound lines First-In-First-Out against earlier inbound batches
//!   and deducts that cost, refusing to drive any balance below zero
//! - marks the document posted, all inside one store transaction
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_inventory::{InMemoryLedgerStore, PostingConfig, PostingService};
//!
//! let store = InMemoryLedgerStore::new();
//! let service = PostingService::new(store.clone(), &PostingConfig::default())?;
//!
//! let receipt = service.post_document(document_id).await?;
//! ```

pub mod config;
pub mod error;
pub mod document;
pub mod operation;
pub mod balance;
pub mod fifo;
pub mod store;
pub mod memory;
pub mod posting;
pub mod report;

pub use config::PostingConfig;
pub use error::PostingError;
pub use document::{
    Document, DocumentLine, LineAmounts, NewDocument, NewDocumentLine, Nomenclature, PostingKey,
    DEFAULT_STOCK_ACCOUNT,
};
pub use operation::{Direction, OperationClassifier};
pub use balance::{BalanceManager, InventoryBalance};
pub use fifo::{allocate_fifo, BatchTake, FifoCost, FifoCostCalculator, InboundBatch};
pub use store::{LedgerStore, LedgerTransaction, PostedLine};
pub use memory::{InMemoryLedgerStore, InMemoryTransaction};
pub use posting::{PostingReceipt, PostingService};
pub use report::{inventory_on_date, sales_between, InventoryPosition, SalesLine};
