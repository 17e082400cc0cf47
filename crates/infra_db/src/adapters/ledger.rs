//! PostgreSQL Ledger Adapter
//!
//! Implements the `LedgerStore` and `LedgerTransaction` ports on top of
//! [`LedgerRepository`] and one SQLx transaction per posting attempt.
//!
//! Row locks (`SELECT ... FOR UPDATE`) stand in for the exclusive locks the
//! port contract asks for. Lock waits are bounded by the pool's
//! `lock_timeout`; a timeout, deadlock or serialization failure surfaces as
//! `PortError::Conflict`, which the posting engine retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_inventory::{PostingConfig, PostingService};
//!
//! let store = PostgresLedgerStore::new(pool);
//! let service = PostingService::new(store, &PostingConfig::default())?;
//! service.post_document(document_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{DocumentId, DocumentLineId, DomainPort, Money, NomenclatureId, PortError};
use domain_inventory::{
    Document, InboundBatch, InventoryBalance, LedgerStore, LedgerTransaction, Nomenclature,
    PostedLine, PostingKey,
};

use crate::repositories::ledger::{self, LedgerRepository};

/// PostgreSQL-backed implementation of the `LedgerStore` port
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    repository: LedgerRepository,
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: LedgerRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }
}

// Mark as a domain port
impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Transaction = PostgresLedgerTransaction;

    async fn ping(&self) -> Result<(), PortError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::from(crate::DatabaseError::from(e)))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Self::Transaction, PortError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::from(crate::DatabaseError::from(e)))?;
        Ok(PostgresLedgerTransaction { tx })
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn upsert_item(&self, item: &Nomenclature) -> Result<(), PortError> {
        Ok(self.repository.upsert_item(item).await?)
    }

    async fn get_item(&self, id: NomenclatureId) -> Result<Option<Nomenclature>, PortError> {
        Ok(self.repository.get_item(id).await?)
    }

    #[instrument(skip(self, document), fields(document_id = %document.id, lines = document.lines.len()))]
    async fn insert_document(&self, document: &Document) -> Result<(), PortError> {
        self.repository.insert_document(document).await?;
        debug!("Document stored");
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, PortError> {
        Ok(self.repository.get_document(id).await?)
    }

    async fn list_documents(&self) -> Result<Vec<Document>, PortError> {
        Ok(self.repository.list_documents().await?)
    }

    async fn get_balance(
        &self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError> {
        Ok(self.repository.get_balance(item, account).await?)
    }

    async fn list_balances(&self) -> Result<Vec<InventoryBalance>, PortError> {
        Ok(self.repository.list_balances().await?)
    }

    async fn posted_lines_until(&self, until: DateTime<Utc>) -> Result<Vec<PostedLine>, PortError> {
        Ok(self.repository.posted_lines_until(until).await?)
    }

    async fn posted_lines_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        operation_types: &[String],
    ) -> Result<Vec<PostedLine>, PortError> {
        Ok(self.repository.posted_lines_between(from, to, operation_types).await?)
    }
}

/// One posting attempt on a pooled connection
///
/// Dropping the handle without committing rolls the transaction back.
pub struct PostgresLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    async fn load_document_for_update(&mut self, id: DocumentId) -> Result<Option<Document>, PortError> {
        Ok(ledger::load_document_for_update(&mut self.tx, id).await?)
    }

    async fn lock_item(&mut self, item: NomenclatureId) -> Result<(), PortError> {
        Ok(ledger::lock_item(&mut self.tx, item).await?)
    }

    async fn balance_for_update(
        &mut self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError> {
        Ok(ledger::balance_for_update(&mut self.tx, item, account).await?)
    }

    async fn insert_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError> {
        Ok(ledger::insert_balance(&mut self.tx, balance).await?)
    }

    async fn update_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError> {
        Ok(ledger::update_balance(&mut self.tx, balance).await?)
    }

    async fn outbound_quantity_before(
        &mut self,
        item: NomenclatureId,
        before: PostingKey,
        outbound_types: &[String],
    ) -> Result<Decimal, PortError> {
        Ok(ledger::outbound_quantity_before(
            &mut self.tx,
            item,
            before.document_date,
            before.document_id,
            outbound_types,
        )
        .await?)
    }

    async fn inbound_batches(
        &mut self,
        item: NomenclatureId,
        inbound_types: &[String],
    ) -> Result<Vec<InboundBatch>, PortError> {
        Ok(ledger::inbound_batches(&mut self.tx, item, inbound_types).await?)
    }

    async fn set_line_cost(&mut self, line: DocumentLineId, cost: Money) -> Result<(), PortError> {
        Ok(ledger::set_line_cost(&mut self.tx, *line.as_uuid(), cost.amount()).await?)
    }

    async fn mark_posted(&mut self, id: DocumentId, at: DateTime<Utc>) -> Result<(), PortError> {
        Ok(ledger::mark_posted(&mut self.tx, id, at).await?)
    }

    async fn commit(self) -> Result<(), PortError> {
        self.tx
            .commit()
            .await
            .map_err(|e| PortError::from(crate::DatabaseError::from(e)))
    }

    async fn rollback(self) -> Result<(), PortError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| PortError::from(crate::DatabaseError::from(e)))
    }
}
