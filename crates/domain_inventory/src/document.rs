//! Stock documents and their lines
//!
//! A document owns its lines. Until it is posted, a document has no effect
//! on balances; after posting it is read-only and outbound lines carry the
//! FIFO cost written back by the posting engine.

use chrono::{DateTime, Utc};
use core_kernel::{CoreError, CounterpartyId, DocumentId, DocumentLineId, Money, NomenclatureId, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock account used when a line does not name one
pub const DEFAULT_STOCK_ACCOUNT: &str = "281";

const DEFAULT_UNIT: &str = "pcs";
const DEFAULT_CURRENCY: &str = "UAH";

/// A tracked stock-keeping unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomenclature {
    pub id: NomenclatureId,
    pub name: String,
    pub vat_rate: Option<Rate>,
}

impl Nomenclature {
    pub fn new(id: NomenclatureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            vat_rate: None,
        }
    }

    pub fn with_vat_rate(mut self, rate: Rate) -> Self {
        self.vat_rate = Some(rate);
        self
    }
}

/// Canonical posting order of documents: by date, then by id
///
/// Field order matters, the derived `Ord` compares `document_date` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostingKey {
    pub document_date: DateTime<Utc>,
    pub document_id: DocumentId,
}

impl PostingKey {
    pub fn new(document_date: DateTime<Utc>, document_id: DocumentId) -> Self {
        Self {
            document_date,
            document_id,
        }
    }
}

/// A stock document header with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub document_date: DateTime<Utc>,
    pub operation_type: String,
    pub is_posted: bool,
    pub counterparty_id: Option<CounterpartyId>,
    pub contract_name: Option<String>,
    pub currency: String,
    /// Sum of the lines' net totals, informational only
    pub total_amount: Money,
    pub last_updated: Option<DateTime<Utc>>,
    pub lines: Vec<DocumentLine>,
}

impl Document {
    pub fn posting_key(&self) -> PostingKey {
        PostingKey::new(self.document_date, self.id)
    }
}

/// One item movement within a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub id: DocumentLineId,
    pub document_id: DocumentId,
    /// Position of the line inside its document, starting at 1
    pub line_no: i32,
    pub nomenclature_id: NomenclatureId,
    /// Item name as loaded with the line, used in messages
    pub item_name: Option<String>,
    pub account: String,
    pub quantity: Decimal,
    pub unit: String,
    pub price_with_vat: Money,
    pub total_with_vat: Money,
    pub vat_amount: Money,
    /// Net (without VAT) line total
    pub total_amount: Money,
    /// FIFO cost of goods, set on outbound lines when posted
    pub total_cost: Option<Money>,
}

impl DocumentLine {
    /// Name to show for the line's item
    pub fn display_name(&self) -> String {
        self.item_name
            .clone()
            .unwrap_or_else(|| self.nomenclature_id.to_string())
    }
}

/// Amounts derived from a quantity and a VAT-inclusive unit price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub price_without_vat: Money,
    pub total_without_vat: Money,
    pub total_with_vat: Money,
    pub vat_amount: Money,
}

impl LineAmounts {
    /// Splits a gross price into net and VAT parts
    ///
    /// Results keep full precision; callers round when storing.
    pub fn from_price_with_vat(
        quantity: Decimal,
        price_with_vat: Money,
        vat_rate: Rate,
    ) -> Result<Self, CoreError> {
        if quantity <= Decimal::ZERO {
            return Err(CoreError::validation(format!(
                "Quantity must be positive, got {}",
                quantity
            )));
        }
        if price_with_vat.is_negative() {
            return Err(CoreError::validation(format!(
                "Price must not be negative, got {}",
                price_with_vat
            )));
        }

        let price_without_vat = price_with_vat.divide(vat_rate.multiplier())?;
        let total_with_vat = price_with_vat * quantity;
        let total_without_vat = price_without_vat * quantity;

        Ok(Self {
            price_without_vat,
            total_without_vat,
            total_with_vat,
            vat_amount: total_with_vat - total_without_vat,
        })
    }
}

/// Input for one line of a new document
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocumentLine {
    pub nomenclature_id: NomenclatureId,
    pub account: String,
    pub quantity: Decimal,
    pub price_with_vat: Money,
    pub unit: String,
}

impl NewDocumentLine {
    pub fn new(nomenclature_id: NomenclatureId, quantity: Decimal, price_with_vat: Money) -> Self {
        Self {
            nomenclature_id,
            account: DEFAULT_STOCK_ACCOUNT.to_string(),
            quantity,
            price_with_vat,
            unit: DEFAULT_UNIT.to_string(),
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

/// Builder for an unposted document
///
/// # Example
///
/// ```rust,ignore
/// let document = NewDocument::new("Purchase", Utc::now())
///     .counterparty(supplier_id)
///     .line(NewDocumentLine::new(item_id, dec!(10), Money::new(dec!(12))))
///     .build(Rate::new(dec!(0.20)))?;
/// ```
#[derive(Debug, Clone)]
pub struct NewDocument {
    id: DocumentId,
    operation_type: String,
    document_date: DateTime<Utc>,
    counterparty_id: Option<CounterpartyId>,
    contract_name: Option<String>,
    currency: String,
    lines: Vec<NewDocumentLine>,
}

impl NewDocument {
    pub fn new(operation_type: impl Into<String>, document_date: DateTime<Utc>) -> Self {
        Self {
            id: DocumentId::new(),
            operation_type: operation_type.into(),
            document_date,
            counterparty_id: None,
            contract_name: None,
            currency: DEFAULT_CURRENCY.to_string(),
            lines: Vec::new(),
        }
    }

    /// Uses a caller-chosen id instead of a random one
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    pub fn counterparty(mut self, counterparty_id: CounterpartyId) -> Self {
        self.counterparty_id = Some(counterparty_id);
        self
    }

    pub fn contract_name(mut self, name: impl Into<String>) -> Self {
        self.contract_name = Some(name.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn line(mut self, line: NewDocumentLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Computes line amounts and assembles the unposted document
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty document, a non-positive
    /// quantity or a negative price.
    pub fn build(self, vat_rate: Rate) -> Result<Document, CoreError> {
        if self.lines.is_empty() {
            return Err(CoreError::validation("Document must have at least one line"));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        let mut total_without_vat = Money::zero();

        for (index, input) in self.lines.into_iter().enumerate() {
            let amounts = LineAmounts::from_price_with_vat(input.quantity, input.price_with_vat, vat_rate)?;
            total_without_vat += amounts.total_without_vat;

            let line_total_with_vat = amounts.total_with_vat.round_half_up();
            let line_total = amounts.total_without_vat.round_half_up();

            lines.push(DocumentLine {
                id: DocumentLineId::new(),
                document_id: self.id,
                line_no: index as i32 + 1,
                nomenclature_id: input.nomenclature_id,
                item_name: None,
                account: input.account,
                quantity: input.quantity,
                unit: input.unit,
                price_with_vat: input.price_with_vat.round_half_up(),
                total_with_vat: line_total_with_vat,
                vat_amount: line_total_with_vat - line_total,
                total_amount: line_total,
                total_cost: None,
            });
        }

        Ok(Document {
            id: self.id,
            document_date: self.document_date,
            operation_type: self.operation_type,
            is_posted: false,
            counterparty_id: self.counterparty_id,
            contract_name: self.contract_name,
            currency: self.currency,
            total_amount: total_without_vat.round_half_up(),
            last_updated: None,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn vat() -> Rate {
        Rate::new(dec!(0.20))
    }

    #[test]
    fn test_line_amounts_split_vat() {
        let amounts = LineAmounts::from_price_with_vat(dec!(10), Money::new(dec!(12)), vat()).unwrap();
        assert_eq!(amounts.price_without_vat.amount(), dec!(10));
        assert_eq!(amounts.total_with_vat.amount(), dec!(120));
        assert_eq!(amounts.total_without_vat.amount(), dec!(100));
        assert_eq!(amounts.vat_amount.amount(), dec!(20));
    }

    #[test]
    fn test_line_amounts_reject_non_positive_quantity() {
        let result = LineAmounts::from_price_with_vat(Decimal::ZERO, Money::new(dec!(12)), vat());
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_build_rounds_stored_amounts() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let item = NomenclatureId::new();
        let document = NewDocument::new("Purchase", date)
            .line(NewDocumentLine::new(item, dec!(3), Money::new(dec!(10))))
            .build(vat())
            .unwrap();

        let line = &document.lines[0];
        // 10 / 1.2 = 8.3333..., times 3 = 25.0000 (rounded)
        assert_eq!(line.total_amount.amount(), dec!(25.00));
        assert_eq!(line.total_with_vat.amount(), dec!(30.00));
        assert_eq!(line.vat_amount.amount(), dec!(5.00));
        assert_eq!(line.account, DEFAULT_STOCK_ACCOUNT);
        assert_eq!(line.line_no, 1);
        assert!(line.total_cost.is_none());
        assert_eq!(document.total_amount.amount(), dec!(25.00));
        assert!(!document.is_posted);
    }

    #[test]
    fn test_stored_vat_is_difference_of_rounded_totals() {
        // 0.5 x 0.05 = 0.025 gross -> 0.03; net 0.02083... -> 0.02
        let document = NewDocument::new("Sale", Utc::now())
            .line(NewDocumentLine::new(NomenclatureId::new(), dec!(0.5), Money::new(dec!(0.05))))
            .build(vat())
            .unwrap();

        let line = &document.lines[0];
        assert_eq!(line.total_with_vat.amount(), dec!(0.03));
        assert_eq!(line.total_amount.amount(), dec!(0.02));
        assert_eq!(line.vat_amount.amount(), dec!(0.01));
        assert_eq!(line.vat_amount, line.total_with_vat - line.total_amount);
    }

    #[test]
    fn test_build_requires_lines() {
        let result = NewDocument::new("Sale", Utc::now()).build(vat());
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_posting_key_orders_by_date_then_id() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let low = DocumentId::from_uuid(uuid::Uuid::from_u128(1));
        let high = DocumentId::from_uuid(uuid::Uuid::from_u128(2));

        assert!(PostingKey::new(date, high) < PostingKey::new(later, low));
        assert!(PostingKey::new(date, low) < PostingKey::new(date, high));
    }
}
