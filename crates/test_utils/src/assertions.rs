//! Custom Test Assertions
//!
//! Assertion helpers for ledger types that give more meaningful failure
//! messages than comparing structs field by field.

use core_kernel::{Money, NomenclatureId};
use domain_inventory::{InventoryBalance, LedgerStore, PostingError, PostingReceipt};
use rust_decimal::Decimal;

/// Asserts that a Money value equals an amount
pub fn assert_money_eq(actual: Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts quantity and value of a stored balance
///
/// # Panics
///
/// Panics if the balance row is missing or differs
pub async fn assert_balance<S: LedgerStore>(
    store: &S,
    item: NomenclatureId,
    account: &str,
    quantity: Decimal,
    amount: Decimal,
) {
    let balance = store
        .get_balance(item, account)
        .await
        .expect("balance lookup should succeed")
        .unwrap_or_else(|| panic!("No balance for {} on account {}", item, account));

    assert_eq!(
        balance.quantity, quantity,
        "Quantity mismatch for {} on {}: actual={}, expected={}",
        item, account, balance.quantity, quantity
    );
    assert_money_eq(balance.total_amount, amount);
}

/// Asserts that no balance row holds a negative quantity
pub fn assert_no_negative_balances(balances: &[InventoryBalance]) {
    for balance in balances {
        assert!(
            balance.quantity >= Decimal::ZERO,
            "Negative balance for {} on account {}: {}",
            balance.nomenclature_id,
            balance.account,
            balance.quantity
        );
    }
}

/// Asserts that a posting failed for lack of stock with the given figures
pub fn assert_insufficient_stock(
    result: &Result<PostingReceipt, PostingError>,
    expected_available: Decimal,
    expected_requested: Decimal,
) {
    match result {
        Err(PostingError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(*available, expected_available, "available quantity");
            assert_eq!(*requested, expected_requested, "requested quantity");
        }
        other => panic!("Expected InsufficientStock, got {:?}", other),
    }
}

/// Asserts the FIFO cost written to the outbound line at `index`
pub fn assert_line_cost(receipt: &PostingReceipt, index: usize, expected: Decimal) {
    let (line, cost) = receipt
        .line_costs
        .get(index)
        .unwrap_or_else(|| panic!("Receipt has no line cost at index {}", index));
    assert_eq!(
        cost.amount(),
        expected,
        "Cost mismatch for line {}: actual={}, expected={}",
        line,
        cost,
        expected
    );
}
