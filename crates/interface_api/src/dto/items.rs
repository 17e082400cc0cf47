//! Item DTOs

use core_kernel::{NomenclatureId, Rate};
use domain_inventory::Nomenclature;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertItemRequest {
    /// Existing item to rename; a new id is generated when absent
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(custom(function = "rate_in_range"))]
    pub vat_rate: Option<Decimal>,
}

impl UpsertItemRequest {
    pub fn into_item(self) -> Nomenclature {
        let id = self.id.map(NomenclatureId::from_uuid).unwrap_or_default();
        let item = Nomenclature::new(id, self.name);
        match self.vat_rate {
            Some(rate) => item.with_vat_rate(Rate::new(rate)),
            None => item,
        }
    }
}

fn rate_in_range(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate >= Decimal::ONE {
        return Err(ValidationError::new("rate_out_of_range"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub vat_rate: Option<Decimal>,
}

impl From<Nomenclature> for ItemResponse {
    fn from(item: Nomenclature) -> Self {
        Self {
            id: item.id.into(),
            name: item.name,
            vat_rate: item.vat_rate.map(|rate| rate.as_decimal()),
        }
    }
}
