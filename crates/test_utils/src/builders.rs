//! Test Data Builders
//!
//! Builders that produce stored documents with only the relevant fields
//! spelled out, plus a seeder that writes them into any `LedgerStore`.

use chrono::{DateTime, Utc};
use core_kernel::{CounterpartyId, DocumentId, Money, NomenclatureId};
use domain_inventory::{Document, LedgerStore, NewDocument, NewDocumentLine, Nomenclature};
use rust_decimal::Decimal;

use crate::fixtures::{DateFixtures, PriceFixtures};

/// Builder for unposted test documents
pub struct TestDocumentBuilder {
    operation_type: String,
    document_date: DateTime<Utc>,
    id: Option<DocumentId>,
    counterparty: Option<CounterpartyId>,
    lines: Vec<NewDocumentLine>,
}

impl TestDocumentBuilder {
    /// Starts a document of any operation type dated day 1
    pub fn new(operation_type: impl Into<String>) -> Self {
        Self {
            operation_type: operation_type.into(),
            document_date: DateFixtures::day(1),
            id: None,
            counterparty: None,
            lines: Vec::new(),
        }
    }

    /// Starts a `Purchase` document
    pub fn purchase() -> Self {
        Self::new("Purchase")
    }

    /// Starts a `Sale` document
    pub fn sale() -> Self {
        Self::new("Sale")
    }

    /// Sets the document date
    pub fn on(mut self, date: DateTime<Utc>) -> Self {
        self.document_date = date;
        self
    }

    /// Sets the document ID
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the counterparty
    pub fn counterparty(mut self, counterparty: CounterpartyId) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    /// Adds a line on the default stock account
    pub fn line(mut self, item: NomenclatureId, quantity: Decimal, gross_price: Money) -> Self {
        self.lines.push(NewDocumentLine::new(item, quantity, gross_price));
        self
    }

    /// Adds a line on an explicit account
    pub fn line_on(mut self, item: NomenclatureId, account: &str, quantity: Decimal, gross_price: Money) -> Self {
        self.lines
            .push(NewDocumentLine::new(item, quantity, gross_price).account(account));
        self
    }

    /// Builds the document at the default VAT rate
    pub fn build(self) -> Document {
        let mut document = NewDocument::new(self.operation_type, self.document_date);
        if let Some(id) = self.id {
            document = document.with_id(id);
        }
        if let Some(counterparty) = self.counterparty {
            document = document.counterparty(counterparty);
        }
        self.lines
            .into_iter()
            .fold(document, NewDocument::line)
            .build(PriceFixtures::vat())
            .expect("test document should be valid")
    }
}

/// Writes items and documents into a ledger store
pub struct LedgerSeeder<'a, S> {
    store: &'a S,
}

impl<'a, S: LedgerStore> LedgerSeeder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Registers an item
    pub async fn item(&self, item: Nomenclature) -> NomenclatureId {
        self.store.upsert_item(&item).await.expect("item should be stored");
        item.id
    }

    /// Stores a built document and returns it
    pub async fn document(&self, document: Document) -> Document {
        self.store
            .insert_document(&document)
            .await
            .expect("document should be stored");
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ItemFixtures;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_defaults() {
        let item = ItemFixtures::cable().id;
        let document = TestDocumentBuilder::purchase()
            .line(item, dec!(10), PriceFixtures::gross_12())
            .build();

        assert_eq!(document.operation_type, "Purchase");
        assert_eq!(document.document_date, DateFixtures::day(1));
        assert_eq!(document.lines[0].total_amount.amount(), dec!(100));
        assert!(!document.is_posted);
    }

    #[test]
    fn test_builder_date_and_account() {
        let item = ItemFixtures::plug().id;
        let document = TestDocumentBuilder::sale()
            .on(DateFixtures::day(5))
            .line_on(item, "201", dec!(1), PriceFixtures::sale_price())
            .build();

        assert_eq!(document.document_date, DateFixtures::day(5));
        assert_eq!(document.lines[0].account, "201");
    }
}
