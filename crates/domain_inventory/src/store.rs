//! Ledger store ports
//!
//! The posting engine never reaches a database directly. It opens a
//! [`LedgerTransaction`] from a [`LedgerStore`] and passes that handle
//! explicitly to every component that reads or writes ledger data.
//!
//! # Locking contract
//!
//! Implementations must make `load_document_for_update`, `lock_item` and
//! `balance_for_update` hold exclusive locks until the transaction commits
//! or rolls back. The orchestrator acquires them in a fixed order (document,
//! then items sorted by id, then balances sorted by `(item, account)`), so
//! postings touching overlapping items serialize without deadlocking, while
//! postings touching disjoint items proceed in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{CounterpartyId, DocumentId, DocumentLineId, DomainPort, Money, NomenclatureId, PortError};
use rust_decimal::Decimal;

use crate::balance::InventoryBalance;
use crate::document::{Document, DocumentLine, Nomenclature, PostingKey};
use crate::fifo::InboundBatch;

/// A line of a posted document together with its header fields
#[derive(Debug, Clone, PartialEq)]
pub struct PostedLine {
    pub document_id: DocumentId,
    pub document_date: DateTime<Utc>,
    pub operation_type: String,
    pub counterparty_id: Option<CounterpartyId>,
    pub line: DocumentLine,
}

/// Persistent ledger: documents, items and balances
#[async_trait]
pub trait LedgerStore: DomainPort {
    /// Transaction handle type produced by [`LedgerStore::begin`]
    type Transaction: LedgerTransaction;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Opens a transaction for one posting attempt
    async fn begin(&self) -> Result<Self::Transaction, PortError>;

    /// Registers or renames an item
    async fn upsert_item(&self, item: &Nomenclature) -> Result<(), PortError>;

    /// Looks up an item
    async fn get_item(&self, id: NomenclatureId) -> Result<Option<Nomenclature>, PortError>;

    /// Stores a new, unposted document with its lines
    async fn insert_document(&self, document: &Document) -> Result<(), PortError>;

    /// Reads a document with its lines, for display
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, PortError>;

    /// Lists documents (with lines) in posting order
    async fn list_documents(&self) -> Result<Vec<Document>, PortError>;

    /// Reads one balance row, for display
    async fn get_balance(
        &self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError>;

    /// Lists all balance rows ordered by `(item, account)`
    async fn list_balances(&self) -> Result<Vec<InventoryBalance>, PortError>;

    /// Lines of posted documents dated at or before `until`, in posting order
    async fn posted_lines_until(&self, until: DateTime<Utc>) -> Result<Vec<PostedLine>, PortError>;

    /// Lines of posted documents of `operation_types` dated within
    /// `from..=to`, in posting order
    async fn posted_lines_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        operation_types: &[String],
    ) -> Result<Vec<PostedLine>, PortError>;
}

/// One all-or-nothing unit of ledger work
///
/// Dropping a transaction without committing discards its changes.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Loads a document with its lines (and item names) and locks it
    async fn load_document_for_update(&mut self, id: DocumentId) -> Result<Option<Document>, PortError>;

    /// Takes the item-wide lock guarding its balances and FIFO history
    async fn lock_item(&mut self, item: NomenclatureId) -> Result<(), PortError>;

    /// Reads a balance row under an exclusive lock, seeing this transaction's writes
    async fn balance_for_update(
        &mut self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError>;

    /// Stages a new balance row
    async fn insert_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError>;

    /// Stages an update of an existing balance row
    async fn update_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError>;

    /// Total quantity of `item` withdrawn by posted outbound documents that
    /// precede `before` in posting order
    async fn outbound_quantity_before(
        &mut self,
        item: NomenclatureId,
        before: PostingKey,
        outbound_types: &[String],
    ) -> Result<Decimal, PortError>;

    /// Posted inbound lines of `item`, ordered by date, document id, line number
    async fn inbound_batches(
        &mut self,
        item: NomenclatureId,
        inbound_types: &[String],
    ) -> Result<Vec<InboundBatch>, PortError>;

    /// Stages the FIFO cost of an outbound line
    async fn set_line_cost(&mut self, line: DocumentLineId, cost: Money) -> Result<(), PortError>;

    /// Stages the posted flag of a document
    async fn mark_posted(&mut self, id: DocumentId, at: DateTime<Utc>) -> Result<(), PortError>;

    /// Makes every staged change visible at once
    async fn commit(self) -> Result<(), PortError>;

    /// Discards every staged change
    async fn rollback(self) -> Result<(), PortError>;
}
