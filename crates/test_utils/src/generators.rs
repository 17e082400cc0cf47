//! Property-Based Test Generators
//!
//! Proptest strategies for quantities, prices and random sequences of stock
//! movements against one item.

use core_kernel::Money;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// One document to post against a single item
#[derive(Debug, Clone, PartialEq)]
pub enum StockMovement {
    /// Inbound quantity at a VAT-inclusive unit price
    Purchase { quantity: Decimal, gross_price: Money },
    /// Outbound quantity
    Sale { quantity: Decimal },
}

impl StockMovement {
    pub fn quantity(&self) -> Decimal {
        match self {
            StockMovement::Purchase { quantity, .. } | StockMovement::Sale { quantity } => *quantity,
        }
    }
}

/// Strategy for positive whole quantities
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100i64).prop_map(Decimal::from)
}

/// Strategy for positive fractional quantities with up to 3 decimal places
pub fn fractional_quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|n| Decimal::new(n, 3))
}

/// Strategy for VAT-inclusive unit prices between 0.01 and 10 000.00
pub fn gross_price_strategy() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(Money::from_minor)
}

/// Strategy for a single purchase or sale
pub fn movement_strategy() -> impl Strategy<Value = StockMovement> {
    prop_oneof![
        (quantity_strategy(), gross_price_strategy())
            .prop_map(|(quantity, gross_price)| StockMovement::Purchase { quantity, gross_price }),
        quantity_strategy().prop_map(|quantity| StockMovement::Sale { quantity }),
    ]
}

/// Strategy for a sequence of movements that starts with a purchase
pub fn movement_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<StockMovement>> {
    (
        quantity_strategy(),
        gross_price_strategy(),
        proptest::collection::vec(movement_strategy(), 0..max_len),
    )
        .prop_map(|(quantity, gross_price, rest)| {
            let mut movements = vec![StockMovement::Purchase { quantity, gross_price }];
            movements.extend(rest);
            movements
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn quantities_are_positive(q in quantity_strategy()) {
            prop_assert!(q > Decimal::ZERO);
        }

        #[test]
        fn fractional_quantities_fit_storage_scale(q in fractional_quantity_strategy()) {
            prop_assert!(q > Decimal::ZERO);
            prop_assert!(q.scale() <= 3);
        }

        #[test]
        fn sequences_start_with_purchase(movements in movement_sequence_strategy(10)) {
            let starts_with_purchase = matches!(movements.first(), Some(StockMovement::Purchase { .. }));
            prop_assert!(starts_with_purchase);
        }
    }
}
