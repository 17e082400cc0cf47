//! Document DTOs

use chrono::{DateTime, Utc};
use core_kernel::{CounterpartyId, Money, NomenclatureId};
use domain_inventory::{NewDocument, NewDocumentLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 100))]
    pub operation_type: String,
    pub document_date: DateTime<Utc>,
    pub counterparty_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub contract_name: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(length(min = 1), nested)]
    pub lines: Vec<DocumentLineRequest>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct DocumentLineRequest {
    pub nomenclature_id: Uuid,
    #[validate(custom(function = "positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "not_negative"))]
    pub price_with_vat: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub account: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
}

impl CreateDocumentRequest {
    /// Item ids referenced by the lines, in line order
    pub fn item_ids(&self) -> Vec<NomenclatureId> {
        self.lines
            .iter()
            .map(|line| NomenclatureId::from_uuid(line.nomenclature_id))
            .collect()
    }

    /// Turns the request into a document builder
    pub fn into_new_document(self) -> NewDocument {
        let mut document = NewDocument::new(self.operation_type, self.document_date);
        if let Some(counterparty) = self.counterparty_id {
            document = document.counterparty(CounterpartyId::from_uuid(counterparty));
        }
        if let Some(contract) = self.contract_name {
            document = document.contract_name(contract);
        }
        if let Some(currency) = self.currency {
            document = document.currency(currency);
        }

        self.lines
            .into_iter()
            .map(DocumentLineRequest::into_new_line)
            .fold(document, NewDocument::line)
    }
}

impl DocumentLineRequest {
    fn into_new_line(self) -> NewDocumentLine {
        let mut line = NewDocumentLine::new(
            NomenclatureId::from_uuid(self.nomenclature_id),
            self.quantity,
            Money::new(self.price_with_vat),
        );
        if let Some(account) = self.account {
            line = line.account(account);
        }
        if let Some(unit) = self.unit {
            line = line.unit(unit);
        }
        line
    }
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

fn not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}
