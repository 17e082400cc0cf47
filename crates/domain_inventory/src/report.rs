//! Stock position and sales reports
//!
//! Both reports are rebuilt from posted document lines rather than from
//! balance rows, so they work for any past date.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use core_kernel::{CounterpartyId, DocumentId, Money, NomenclatureId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::PostingError;
use crate::operation::{Direction, OperationClassifier};
use crate::store::{LedgerStore, PostedLine};

/// Quantity and value of one item on hand at the report date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryPosition {
    pub nomenclature_id: NomenclatureId,
    pub item_name: String,
    pub quantity: Decimal,
    pub value: Money,
}

/// Stock positions after every posting dated on or before `date`
///
/// Inbound lines add their net value, outbound lines subtract their FIFO
/// cost. Lines of unclassified operation types are ignored and items with
/// zero quantity left are omitted. Positions are sorted by item name.
pub async fn inventory_on_date<S: LedgerStore>(
    store: &S,
    classifier: &OperationClassifier,
    date: NaiveDate,
) -> Result<Vec<InventoryPosition>, PostingError> {
    let lines = store.posted_lines_until(end_of_day(date)?).await?;
    let positions = accumulate(classifier, &lines);

    debug!(%date, lines = lines.len(), positions = positions.len(), "Inventory report built");
    Ok(positions)
}

/// One outbound line in the sales report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesLine {
    pub document_date: DateTime<Utc>,
    pub document_id: DocumentId,
    pub counterparty_id: Option<CounterpartyId>,
    pub nomenclature_id: NomenclatureId,
    pub item_name: String,
    pub quantity: Decimal,
    /// Net sale amount
    pub revenue: Money,
}

impl From<PostedLine> for SalesLine {
    fn from(posted: PostedLine) -> Self {
        Self {
            document_date: posted.document_date,
            document_id: posted.document_id,
            counterparty_id: posted.counterparty_id,
            nomenclature_id: posted.line.nomenclature_id,
            item_name: posted.line.display_name(),
            quantity: posted.line.quantity,
            revenue: posted.line.total_amount,
        }
    }
}

/// Posted outbound lines dated from the start of `from` to the end of `to`,
/// in posting order
///
/// Returns `PostingError::InvalidDocument` when `to` precedes `from`.
pub async fn sales_between<S: LedgerStore>(
    store: &S,
    classifier: &OperationClassifier,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SalesLine>, PostingError> {
    if to < from {
        return Err(PostingError::InvalidDocument(format!(
            "report period {}..{} ends before it starts",
            from, to
        )));
    }

    let lines = store
        .posted_lines_between(start_of_day(from)?, end_of_day(to)?, &classifier.outbound_types())
        .await?;
    let sales: Vec<SalesLine> = lines.into_iter().map(SalesLine::from).collect();

    debug!(%from, %to, lines = sales.len(), "Sales report built");
    Ok(sales)
}

fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>, PostingError> {
    at_time(date, date.and_hms_opt(0, 0, 0))
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>, PostingError> {
    at_time(date, date.and_hms_nano_opt(23, 59, 59, 999_999_999))
}

fn at_time(date: NaiveDate, time: Option<NaiveDateTime>) -> Result<DateTime<Utc>, PostingError> {
    time.map(|t| Utc.from_utc_datetime(&t))
        .ok_or_else(|| PostingError::InvalidDocument(format!("report date {} is out of range", date)))
}

fn accumulate(classifier: &OperationClassifier, lines: &[PostedLine]) -> Vec<InventoryPosition> {
    let mut positions: HashMap<NomenclatureId, InventoryPosition> = HashMap::new();

    for posted in lines {
        let Ok(direction) = classifier.classify(&posted.operation_type) else {
            continue;
        };
        let line = &posted.line;
        let position = positions
            .entry(line.nomenclature_id)
            .or_insert_with(|| InventoryPosition {
                nomenclature_id: line.nomenclature_id,
                item_name: line.display_name(),
                quantity: Decimal::ZERO,
                value: Money::zero(),
            });

        let value = match direction {
            Direction::Inbound => line.total_amount,
            Direction::Outbound => line.total_cost.unwrap_or_default(),
        };
        let sign = Decimal::from(direction.modifier());
        position.quantity += line.quantity * sign;
        position.value += value * sign;
    }

    let mut result: Vec<InventoryPosition> = positions
        .into_values()
        .filter(|p| !p.quantity.is_zero())
        .collect();
    result.sort_by(|a, b| a.item_name.cmp(&b.item_name).then(a.nomenclature_id.cmp(&b.nomenclature_id)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentLine;
    use crate::memory::InMemoryLedgerStore;
    use core_kernel::DocumentLineId;
    use rust_decimal_macros::dec;

    fn posted(
        operation_type: &str,
        item: NomenclatureId,
        name: &str,
        quantity: Decimal,
        total_amount: Decimal,
        total_cost: Option<Decimal>,
    ) -> PostedLine {
        let document_id = DocumentId::new();
        let document_date: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        PostedLine {
            document_id,
            document_date,
            operation_type: operation_type.to_string(),
            counterparty_id: None,
            line: DocumentLine {
                id: DocumentLineId::new(),
                document_id,
                line_no: 1,
                nomenclature_id: item,
                item_name: Some(name.to_string()),
                account: "281".to_string(),
                quantity,
                unit: "pcs".to_string(),
                price_with_vat: Money::zero(),
                total_with_vat: Money::zero(),
                vat_amount: Money::zero(),
                total_amount: Money::new(total_amount),
                total_cost: total_cost.map(Money::new),
            },
        }
    }

    #[test]
    fn test_inbound_minus_outbound_at_cost() {
        let cable = NomenclatureId::new();
        let lines = vec![
            posted("Purchase", cable, "Cable", dec!(10), dec!(100), None),
            posted("Purchase", cable, "Cable", dec!(10), dec!(140), None),
            posted("Sale", cable, "Cable", dec!(15), dec!(300), Some(dec!(170))),
        ];

        let report = accumulate(&OperationClassifier::default(), &lines);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].quantity, dec!(5));
        assert_eq!(report[0].value.amount(), dec!(70));
    }

    #[test]
    fn test_zero_positions_and_unknown_types_are_omitted() {
        let cable = NomenclatureId::new();
        let plug = NomenclatureId::new();
        let lines = vec![
            posted("Purchase", cable, "Cable", dec!(4), dec!(40), None),
            posted("Sale", cable, "Cable", dec!(4), dec!(60), Some(dec!(40))),
            posted("Inventory count", plug, "Plug", dec!(7), dec!(70), None),
        ];

        assert!(accumulate(&OperationClassifier::default(), &lines).is_empty());
    }

    #[test]
    fn test_sorted_by_item_name() {
        let lines = vec![
            posted("Purchase", NomenclatureId::new(), "Switch", dec!(1), dec!(10), None),
            posted("Purchase", NomenclatureId::new(), "Adapter", dec!(2), dec!(20), None),
        ];

        let names: Vec<String> = accumulate(&OperationClassifier::default(), &lines)
            .into_iter()
            .map(|p| p.item_name)
            .collect();
        assert_eq!(names, vec!["Adapter".to_string(), "Switch".to_string()]);
    }

    #[test]
    fn test_sales_line_carries_net_revenue() {
        let cable = NomenclatureId::new();
        let mut line = posted("Sale", cable, "Cable", dec!(4), dec!(100), Some(dec!(48)));
        let customer = CounterpartyId::new();
        line.counterparty_id = Some(customer);

        let sale = SalesLine::from(line.clone());
        assert_eq!(sale.document_id, line.document_id);
        assert_eq!(sale.counterparty_id, Some(customer));
        assert_eq!(sale.item_name, "Cable");
        assert_eq!(sale.quantity, dec!(4));
        assert_eq!(sale.revenue.amount(), dec!(100));
    }

    #[tokio::test]
    async fn test_inverted_sales_period_is_rejected() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let result = sales_between(&InMemoryLedgerStore::new(), &OperationClassifier::default(), from, to).await;
        assert!(matches!(result, Err(PostingError::InvalidDocument(_))));
    }
}
