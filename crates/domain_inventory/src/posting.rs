//! Posting orchestrator
//!
//! `Unposted -> Posted` is the only transition a document makes. One call to
//! [`PostingService::post_once`] runs one store transaction:
//!
//! 1. load and lock the document, reject missing or already posted ones
//! 2. classify the operation type
//! 3. lock the touched items and balances in sorted order
//! 4. move every line (inbound: add at net value; outbound: FIFO cost, then remove)
//! 5. mark the document posted and commit
//!
//! Any error rolls the transaction back, so a failed posting leaves no trace.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use core_kernel::{CoreError, DocumentId, DocumentLineId, Money, NomenclatureId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::balance::BalanceManager;
use crate::config::PostingConfig;
use crate::document::Document;
use crate::error::PostingError;
use crate::fifo::FifoCostCalculator;
use crate::operation::{Direction, OperationClassifier};
use crate::store::{LedgerStore, LedgerTransaction};

/// What a successful posting did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingReceipt {
    pub document_id: DocumentId,
    pub direction: Direction,
    pub posted_at: DateTime<Utc>,
    /// FIFO cost written to each outbound line, in line order
    pub line_costs: Vec<(DocumentLineId, Money)>,
}

/// Facade that posts documents against a ledger store
#[derive(Debug, Clone)]
pub struct PostingService<S> {
    store: S,
    classifier: OperationClassifier,
    max_conflict_retries: u32,
}

impl<S: LedgerStore> PostingService<S> {
    /// Creates a service from the posting configuration
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` for overlapping operation catalogs.
    pub fn new(store: S, config: &PostingConfig) -> Result<Self, CoreError> {
        Ok(Self {
            store,
            classifier: OperationClassifier::from_config(config)?,
            max_conflict_retries: config.max_conflict_retries,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn classifier(&self) -> &OperationClassifier {
        &self.classifier
    }

    /// Posts a document, re-running the whole attempt after concurrency
    /// conflicts up to the configured number of retries
    pub async fn post_document(&self, document_id: DocumentId) -> Result<PostingReceipt, PostingError> {
        let mut attempt = 0;
        loop {
            match self.post_once(document_id).await {
                Err(e) if e.is_retriable() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        document_id = %document_id,
                        attempt,
                        error = %e,
                        "Posting conflicted with a concurrent transaction, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    /// Posts a document in exactly one transaction attempt
    #[instrument(skip(self))]
    pub async fn post_once(&self, document_id: DocumentId) -> Result<PostingReceipt, PostingError> {
        let mut tx = self.store.begin().await?;

        match self.post_in(&mut tx, document_id).await {
            Ok(receipt) => {
                tx.commit().await?;
                info!(
                    direction = %receipt.direction,
                    lines = receipt.line_costs.len(),
                    "Document posted"
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "Rollback after failed posting also failed");
                }
                if e.is_internal() {
                    error!(error = %e, "Posting aborted by an internal error");
                } else {
                    warn!(error = %e, "Posting rejected");
                }
                Err(e)
            }
        }
    }

    async fn post_in(
        &self,
        tx: &mut S::Transaction,
        document_id: DocumentId,
    ) -> Result<PostingReceipt, PostingError> {
        let document = tx
            .load_document_for_update(document_id)
            .await?
            .ok_or(PostingError::DocumentNotFound(document_id))?;

        if document.is_posted {
            return Err(PostingError::AlreadyPosted(document_id));
        }

        let direction = self.classifier.classify(&document.operation_type)?;
        validate_lines(&document)?;
        lock_touched_balances(tx, &document).await?;

        let key = document.posting_key();
        let fifo = FifoCostCalculator::new(&self.classifier);
        let mut consumed_in_document: HashMap<NomenclatureId, Decimal> = HashMap::new();
        let mut line_costs = Vec::new();

        for line in &document.lines {
            match direction {
                Direction::Inbound => {
                    BalanceManager::add_stock(
                        tx,
                        line.nomenclature_id,
                        &line.account,
                        line.quantity,
                        line.total_amount,
                    )
                    .await?;
                }
                Direction::Outbound => {
                    let consumed = consumed_in_document
                        .entry(line.nomenclature_id)
                        .or_insert(Decimal::ZERO);
                    let cost = fifo.compute(tx, key, line, *consumed).await?;

                    tx.set_line_cost(line.id, cost.cost).await?;
                    BalanceManager::remove_stock(
                        tx,
                        line.nomenclature_id,
                        &line.display_name(),
                        &line.account,
                        line.quantity,
                        cost.cost,
                    )
                    .await?;

                    if !cost.is_fully_covered() {
                        error!(
                            item = %line.nomenclature_id,
                            line = %line.id,
                            shortfall = %cost.shortfall,
                            partial_cost = %cost.cost,
                            "FIFO history does not cover a quantity the balance allowed"
                        );
                        return Err(PostingError::FifoBatchesExhausted {
                            item: line.nomenclature_id,
                            line: line.id,
                            requested: line.quantity,
                            shortfall: cost.shortfall,
                        });
                    }

                    *consumed += line.quantity;
                    line_costs.push((line.id, cost.cost));
                }
            }
        }

        let posted_at = Utc::now();
        tx.mark_posted(document_id, posted_at).await?;

        Ok(PostingReceipt {
            document_id,
            direction,
            posted_at,
            line_costs,
        })
    }
}

fn validate_lines(document: &Document) -> Result<(), PostingError> {
    if let Some(line) = document.lines.iter().find(|l| l.quantity <= Decimal::ZERO) {
        return Err(PostingError::InvalidDocument(format!(
            "line {} of document {} has non-positive quantity {}",
            line.line_no, document.id, line.quantity
        )));
    }
    Ok(())
}

/// Locks items, then balances, each in ascending order, creating missing
/// balance rows on the way
async fn lock_touched_balances<T: LedgerTransaction>(
    tx: &mut T,
    document: &Document,
) -> Result<(), PostingError> {
    let items: BTreeSet<NomenclatureId> = document.lines.iter().map(|l| l.nomenclature_id).collect();
    for item in &items {
        tx.lock_item(*item).await?;
    }

    let pairs: BTreeSet<(NomenclatureId, &str)> = document
        .lines
        .iter()
        .map(|l| (l.nomenclature_id, l.account.as_str()))
        .collect();
    for (item, account) in pairs {
        BalanceManager::get_or_create(tx, item, account).await?;
    }
    Ok(())
}
