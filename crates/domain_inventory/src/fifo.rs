//! First-In-First-Out cost of goods
//!
//! Every posted inbound line is a batch: a quantity bought at a unit cost of
//! `total_amount / quantity`. Outbound postings consume batches oldest first.
//! Cost lots are tracked per item across all accounts.
//!
//! The calculator does not record which batch units are used up. It
//! re-derives that from history: outbound quantity posted before the
//! current document is skipped from the front of the batch queue, and the
//! line's quantity is taken from what remains.

use chrono::{DateTime, Utc};
use core_kernel::{DocumentId, DocumentLineId, Money, MoneyError, NomenclatureId};
use rust_decimal::Decimal;
use tracing::debug;

use crate::document::{DocumentLine, PostingKey};
use crate::error::PostingError;
use crate::operation::OperationClassifier;
use crate::store::LedgerTransaction;

/// One posted inbound line, seen as a FIFO batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundBatch {
    pub document_id: DocumentId,
    pub document_date: DateTime<Utc>,
    pub line_id: DocumentLineId,
    pub quantity: Decimal,
    /// Net value of the whole batch
    pub total_amount: Money,
}

impl InboundBatch {
    /// Cost of one unit; zero for an empty batch
    pub fn unit_cost(&self) -> Result<Money, MoneyError> {
        self.total_amount.per_unit(self.quantity)
    }
}

/// Units taken from one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTake {
    pub line_id: DocumentLineId,
    pub quantity: Decimal,
    pub unit_cost: Money,
}

/// Result of costing one outbound quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoCost {
    /// Cost rounded to minor units
    pub cost: Money,
    /// Batches consumed, oldest first
    pub takes: Vec<BatchTake>,
    /// Quantity no batch could cover; non-zero means the history is inconsistent
    pub shortfall: Decimal,
}

impl FifoCost {
    pub fn is_fully_covered(&self) -> bool {
        self.shortfall.is_zero()
    }
}

/// Walks `batches` in order, skips `already_consumed` units, then takes
/// `requested` units and prices them at each batch's unit cost
///
/// Pure; `batches` must already be in FIFO order. If the batches run out,
/// the partial cost is returned together with the uncovered `shortfall`.
/// Fails only when a batch's unit cost cannot be represented.
pub fn allocate_fifo(
    batches: &[InboundBatch],
    already_consumed: Decimal,
    requested: Decimal,
) -> Result<FifoCost, MoneyError> {
    let mut to_skip = already_consumed.max(Decimal::ZERO);
    let mut remaining = requested.max(Decimal::ZERO);
    let mut cost = Money::zero();
    let mut takes = Vec::new();

    for batch in batches {
        if remaining <= Decimal::ZERO {
            break;
        }

        if to_skip >= batch.quantity {
            to_skip -= batch.quantity;
            continue;
        }

        let available = batch.quantity - to_skip;
        to_skip = Decimal::ZERO;

        let take = remaining.min(available);
        let unit_cost = batch.unit_cost()?;
        cost += unit_cost * take;
        remaining -= take;

        takes.push(BatchTake {
            line_id: batch.line_id,
            quantity: take,
            unit_cost,
        });
    }

    Ok(FifoCost {
        cost: cost.round_half_up(),
        takes,
        shortfall: remaining,
    })
}

/// Reads FIFO history through a transaction and costs outbound lines
pub struct FifoCostCalculator<'a> {
    classifier: &'a OperationClassifier,
}

impl<'a> FifoCostCalculator<'a> {
    pub fn new(classifier: &'a OperationClassifier) -> Self {
        Self { classifier }
    }

    /// Costs one outbound line of the document keyed `key`
    ///
    /// `consumed_in_document` is the quantity of the same item already
    /// withdrawn by earlier lines of this document; it is skipped on top of
    /// what earlier documents consumed. Performs no writes.
    pub async fn compute<T: LedgerTransaction>(
        &self,
        tx: &mut T,
        key: PostingKey,
        line: &DocumentLine,
        consumed_in_document: Decimal,
    ) -> Result<FifoCost, PostingError> {
        let item: NomenclatureId = line.nomenclature_id;

        let consumed_before = tx
            .outbound_quantity_before(item, key, &self.classifier.outbound_types())
            .await?;
        let batches = tx
            .inbound_batches(item, &self.classifier.inbound_types())
            .await?;

        let already_consumed = consumed_before + consumed_in_document;
        let fifo = allocate_fifo(&batches, already_consumed, line.quantity)?;

        debug!(
            item = %item,
            line = %line.id,
            %already_consumed,
            batches = batches.len(),
            batches_used = fifo.takes.len(),
            cost = %fifo.cost,
            "FIFO cost computed"
        );
        Ok(fifo)
    }
}
