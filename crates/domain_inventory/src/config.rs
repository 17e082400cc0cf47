//! Posting engine configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Settings that shape how documents are classified and posted
///
/// Loaded by the API layer through the `config` crate; every field has a
/// default so partial configuration files work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    /// Operation types that bring stock in
    pub inbound_types: Vec<String>,
    /// Operation types that take stock out
    pub outbound_types: Vec<String>,
    /// VAT rate used when building document lines from gross prices
    pub vat_rate: Decimal,
    /// How many times a posting is re-run after a concurrency conflict
    pub max_conflict_retries: u32,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            inbound_types: vec![
                "Purchase".to_string(),
                "Incoming".to_string(),
                "Прибуткова накладна".to_string(),
            ],
            outbound_types: vec![
                "Sale".to_string(),
                "Outgoing".to_string(),
                "Видаткова накладна".to_string(),
            ],
            vat_rate: dec!(0.20),
            max_conflict_retries: 3,
        }
    }
}
