//! Pre-built Test Fixtures
//!
//! Ready-to-use items, dates and prices for ledger tests. Values are chosen
//! so that the VAT split is exact at the default 20% rate: a gross price of
//! 12.00 is 10.00 net, 16.80 is 14.00 net.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{DocumentId, Money, NomenclatureId, Rate};
use domain_inventory::Nomenclature;
use fake::faker::lorem::en::Word;
use fake::Fake;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for inventory items
pub struct ItemFixtures;

impl ItemFixtures {
    /// A cable with a fixed identifier
    pub fn cable() -> Nomenclature {
        Nomenclature::new(NomenclatureId::from_uuid(Uuid::from_u128(0xC0)), "Cable")
    }

    /// A plug with a fixed identifier
    pub fn plug() -> Nomenclature {
        Nomenclature::new(NomenclatureId::from_uuid(Uuid::from_u128(0xD0)), "Plug")
    }

    /// An item with a random identifier and name
    pub fn random() -> Nomenclature {
        let word: String = Word().fake();
        Nomenclature::new(NomenclatureId::new(), format!("{} {}", word, &Uuid::new_v4().to_string()[..8]))
    }
}

/// Fixture for document dates
pub struct DateFixtures;

impl DateFixtures {
    /// 10:00 UTC on the given day of January 2024
    pub fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
    }

    /// The given day of January 2024 as a report date
    pub fn report_date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }
}

/// Fixture for VAT-inclusive prices
pub struct PriceFixtures;

impl PriceFixtures {
    /// Default VAT rate of 20%
    pub fn vat() -> Rate {
        Rate::new(dec!(0.20))
    }

    /// 12.00 gross, 10.00 net
    pub fn gross_12() -> Money {
        Money::new(dec!(12.00))
    }

    /// 16.80 gross, 14.00 net
    pub fn gross_16_80() -> Money {
        Money::new(dec!(16.80))
    }

    /// Selling price used for outbound documents
    pub fn sale_price() -> Money {
        Money::new(dec!(30.00))
    }
}

/// Fixture for identifiers with a known order
pub struct IdFixtures;

impl IdFixtures {
    /// Document id that sorts by `n`
    pub fn ordered_document_id(n: u128) -> DocumentId {
        DocumentId::from_uuid(Uuid::from_u128(n))
    }
}
