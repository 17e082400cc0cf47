//! In-memory ledger store
//!
//! A process-local [`LedgerStore`] used by tests, demos and the API when no
//! database is configured. Committed state sits behind a `RwLock`; each
//! transaction stages its writes privately and applies them in one step on
//! commit. Exclusive document and item locks are `tokio` mutexes held by the
//! transaction until it commits or is dropped, which gives postings the
//! same serialization the PostgreSQL adapter gets from row locks.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{DocumentId, DocumentLineId, DomainPort, Money, NomenclatureId, PortError};
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::balance::InventoryBalance;
use crate::document::{Document, Nomenclature, PostingKey};
use crate::fifo::InboundBatch;
use crate::store::{LedgerStore, LedgerTransaction, PostedLine};

type BalanceKey = (NomenclatureId, String);

#[derive(Debug, Default)]
struct LedgerState {
    items: HashMap<NomenclatureId, Nomenclature>,
    documents: HashMap<DocumentId, Document>,
    balances: BTreeMap<BalanceKey, InventoryBalance>,
}

impl LedgerState {
    fn with_item_names(&self, mut document: Document) -> Document {
        for line in &mut document.lines {
            line.item_name = self.items.get(&line.nomenclature_id).map(|i| i.name.clone());
        }
        document
    }

    fn posted_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values().filter(|d| d.is_posted)
    }

    /// Lines of posted documents accepted by `keep`, in posting order
    fn posted_lines(&self, keep: impl Fn(&Document) -> bool) -> Vec<PostedLine> {
        let mut documents: Vec<&Document> = self.posted_documents().filter(|d| keep(d)).collect();
        documents.sort_by_key(|d| d.posting_key());

        documents
            .into_iter()
            .flat_map(|d| {
                let d = self.with_item_names(d.clone());
                let (id, date, counterparty_id) = (d.id, d.document_date, d.counterparty_id);
                let operation_type = d.operation_type.clone();
                d.lines.into_iter().map(move |line| PostedLine {
                    document_id: id,
                    document_date: date,
                    operation_type: operation_type.clone(),
                    counterparty_id,
                    line,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Document(DocumentId),
    Item(NomenclatureId),
}

/// Named exclusive locks created on first use
#[derive(Debug, Default)]
struct LockTable {
    locks: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockTable {
    async fn acquire(&self, key: LockKey) -> Result<OwnedMutexGuard<()>, PortError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| PortError::internal("lock table poisoned"))?;
            locks.entry(key).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }
}

/// Process-local ledger store
///
/// Cloning is cheap and clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    locks: Arc<LockTable>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, PortError> {
        self.state
            .read()
            .map_err(|_| PortError::internal("ledger state poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, PortError> {
        self.state
            .write()
            .map_err(|_| PortError::internal("ledger state poisoned"))
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, PortError> {
        Ok(InMemoryTransaction {
            state: Arc::clone(&self.state),
            locks: Arc::clone(&self.locks),
            guards: Vec::new(),
            held: HashSet::new(),
            staged: StagedWrites::default(),
        })
    }

    async fn upsert_item(&self, item: &Nomenclature) -> Result<(), PortError> {
        self.write()?.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: NomenclatureId) -> Result<Option<Nomenclature>, PortError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn insert_document(&self, document: &Document) -> Result<(), PortError> {
        let mut state = self.write()?;
        if state.documents.contains_key(&document.id) {
            return Err(PortError::constraint(format!("document {} already exists", document.id)));
        }
        if let Some(line) = document
            .lines
            .iter()
            .find(|l| !state.items.contains_key(&l.nomenclature_id))
        {
            return Err(PortError::not_found("Nomenclature", line.nomenclature_id));
        }
        state.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, PortError> {
        let state = self.read()?;
        Ok(state.documents.get(&id).cloned().map(|d| state.with_item_names(d)))
    }

    async fn list_documents(&self) -> Result<Vec<Document>, PortError> {
        let state = self.read()?;
        let mut documents: Vec<Document> = state
            .documents
            .values()
            .cloned()
            .map(|d| state.with_item_names(d))
            .collect();
        documents.sort_by_key(Document::posting_key);
        Ok(documents)
    }

    async fn get_balance(
        &self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError> {
        Ok(self.read()?.balances.get(&(item, account.to_string())).cloned())
    }

    async fn list_balances(&self) -> Result<Vec<InventoryBalance>, PortError> {
        Ok(self.read()?.balances.values().cloned().collect())
    }

    async fn posted_lines_until(&self, until: DateTime<Utc>) -> Result<Vec<PostedLine>, PortError> {
        let state = self.read()?;
        Ok(state.posted_lines(|d| d.document_date <= until))
    }

    async fn posted_lines_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        operation_types: &[String],
    ) -> Result<Vec<PostedLine>, PortError> {
        let state = self.read()?;
        Ok(state.posted_lines(|d| {
            (from..=to).contains(&d.document_date) && operation_types.contains(&d.operation_type)
        }))
    }
}

#[derive(Debug, Default)]
struct StagedWrites {
    balances: BTreeMap<BalanceKey, InventoryBalance>,
    line_costs: HashMap<DocumentLineId, Money>,
    posted: Vec<(DocumentId, DateTime<Utc>)>,
}

/// Transaction over [`InMemoryLedgerStore`]
pub struct InMemoryTransaction {
    state: Arc<RwLock<LedgerState>>,
    locks: Arc<LockTable>,
    guards: Vec<OwnedMutexGuard<()>>,
    held: HashSet<LockKey>,
    staged: StagedWrites,
}

impl InMemoryTransaction {
    async fn hold(&mut self, key: LockKey) -> Result<(), PortError> {
        if self.held.contains(&key) {
            return Ok(());
        }
        let guard = self.locks.acquire(key.clone()).await?;
        self.guards.push(guard);
        self.held.insert(key);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, PortError> {
        self.state
            .read()
            .map_err(|_| PortError::internal("ledger state poisoned"))
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn load_document_for_update(&mut self, id: DocumentId) -> Result<Option<Document>, PortError> {
        self.hold(LockKey::Document(id)).await?;
        let state = self.read()?;
        Ok(state.documents.get(&id).cloned().map(|d| state.with_item_names(d)))
    }

    async fn lock_item(&mut self, item: NomenclatureId) -> Result<(), PortError> {
        self.hold(LockKey::Item(item)).await
    }

    async fn balance_for_update(
        &mut self,
        item: NomenclatureId,
        account: &str,
    ) -> Result<Option<InventoryBalance>, PortError> {
        self.hold(LockKey::Item(item)).await?;
        let key = (item, account.to_string());
        if let Some(staged) = self.staged.balances.get(&key) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.read()?.balances.get(&key).cloned())
    }

    async fn insert_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError> {
        let key = (balance.nomenclature_id, balance.account.clone());
        let exists = self.staged.balances.contains_key(&key) || self.read()?.balances.contains_key(&key);
        if exists {
            return Err(PortError::constraint(format!(
                "balance for {} on account {} already exists",
                balance.nomenclature_id, balance.account
            )));
        }
        self.staged.balances.insert(key, balance.clone());
        Ok(())
    }

    async fn update_balance(&mut self, balance: &InventoryBalance) -> Result<(), PortError> {
        let key = (balance.nomenclature_id, balance.account.clone());
        let exists = self.staged.balances.contains_key(&key) || self.read()?.balances.contains_key(&key);
        if !exists {
            return Err(PortError::not_found(
                "InventoryBalance",
                format!("{}/{}", balance.nomenclature_id, balance.account),
            ));
        }
        self.staged.balances.insert(key, balance.clone());
        Ok(())
    }

    async fn outbound_quantity_before(
        &mut self,
        item: NomenclatureId,
        before: PostingKey,
        outbound_types: &[String],
    ) -> Result<Decimal, PortError> {
        let state = self.read()?;
        Ok(state
            .posted_documents()
            .filter(|d| outbound_types.contains(&d.operation_type) && d.posting_key() < before)
            .flat_map(|d| d.lines.iter())
            .filter(|l| l.nomenclature_id == item)
            .map(|l| l.quantity)
            .sum())
    }

    async fn inbound_batches(
        &mut self,
        item: NomenclatureId,
        inbound_types: &[String],
    ) -> Result<Vec<InboundBatch>, PortError> {
        let state = self.read()?;
        let mut lines: Vec<(PostingKey, i32, InboundBatch)> = state
            .posted_documents()
            .filter(|d| inbound_types.contains(&d.operation_type))
            .flat_map(|d| d.lines.iter().map(move |l| (d, l)))
            .filter(|(_, l)| l.nomenclature_id == item)
            .map(|(d, l)| {
                (
                    d.posting_key(),
                    l.line_no,
                    InboundBatch {
                        document_id: d.id,
                        document_date: d.document_date,
                        line_id: l.id,
                        quantity: l.quantity,
                        total_amount: l.total_amount,
                    },
                )
            })
            .collect();
        lines.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(lines.into_iter().map(|(_, _, batch)| batch).collect())
    }

    async fn set_line_cost(&mut self, line: DocumentLineId, cost: Money) -> Result<(), PortError> {
        self.staged.line_costs.insert(line, cost);
        Ok(())
    }

    async fn mark_posted(&mut self, id: DocumentId, at: DateTime<Utc>) -> Result<(), PortError> {
        self.staged.posted.push((id, at));
        Ok(())
    }

    async fn commit(self) -> Result<(), PortError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PortError::internal("ledger state poisoned"))?;

        // Validate everything before touching committed state.
        for (id, _) in &self.staged.posted {
            match state.documents.get(id) {
                None => return Err(PortError::not_found("Document", id)),
                Some(d) if d.is_posted => {
                    return Err(PortError::conflict(format!("document {} was posted concurrently", id)))
                }
                Some(_) => {}
            }
        }
        if let Some(negative) = self.staged.balances.values().find(|b| b.quantity.is_sign_negative()) {
            return Err(PortError::constraint(format!(
                "balance quantity of {} on account {} would become {}",
                negative.nomenclature_id, negative.account, negative.quantity
            )));
        }

        for (key, balance) in self.staged.balances {
            state.balances.insert(key, balance);
        }
        for (id, at) in self.staged.posted {
            if let Some(document) = state.documents.get_mut(&id) {
                document.is_posted = true;
                document.last_updated = Some(at);
                for line in &mut document.lines {
                    if let Some(cost) = self.staged.line_costs.get(&line.id) {
                        line.total_cost = Some(*cost);
                    }
                }
            }
        }

        debug!(locks = self.guards.len(), "In-memory transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), PortError> {
        debug!(locks = self.guards.len(), "In-memory transaction rolled back");
        Ok(())
    }
}
