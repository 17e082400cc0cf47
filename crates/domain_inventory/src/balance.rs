//! Inventory balances and the component allowed to change them

use chrono::{DateTime, Utc};
use core_kernel::{Money, NomenclatureId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PostingError;
use crate::store::LedgerTransaction;

/// Running quantity and value of one item on one account
///
/// # Invariants
///
/// - Unique per `(nomenclature_id, account)`
/// - `quantity >= 0` after every committed posting
/// - Never deleted; a zero balance is a legitimate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryBalance {
    pub nomenclature_id: NomenclatureId,
    pub account: String,
    pub quantity: Decimal,
    pub total_amount: Money,
    pub last_updated: Option<DateTime<Utc>>,
}

impl InventoryBalance {
    /// A zero balance for a pair that has not moved yet
    pub fn empty(nomenclature_id: NomenclatureId, account: impl Into<String>) -> Self {
        Self {
            nomenclature_id,
            account: account.into(),
            quantity: Decimal::ZERO,
            total_amount: Money::zero(),
            last_updated: None,
        }
    }
}

/// Applies stock movements to balance rows
///
/// Every method works inside the caller's transaction; nothing becomes
/// visible to other postings before that transaction commits.
pub struct BalanceManager;

impl BalanceManager {
    /// Returns the locked balance of `(item, account)`, creating a zero row
    /// in the transaction if the pair has never moved
    pub async fn get_or_create<T: LedgerTransaction>(
        tx: &mut T,
        item: NomenclatureId,
        account: &str,
    ) -> Result<InventoryBalance, PostingError> {
        if let Some(balance) = tx.balance_for_update(item, account).await? {
            return Ok(balance);
        }

        let balance = InventoryBalance::empty(item, account);
        tx.insert_balance(&balance).await?;
        debug!(item = %item, account, "Created inventory balance");
        Ok(balance)
    }

    /// Increases quantity and value of a balance
    ///
    /// # Errors
    ///
    /// Returns `PostingError::InvalidDocument` for negative inputs.
    pub async fn add_stock<T: LedgerTransaction>(
        tx: &mut T,
        item: NomenclatureId,
        account: &str,
        quantity: Decimal,
        amount: Money,
    ) -> Result<InventoryBalance, PostingError> {
        if quantity.is_sign_negative() || amount.is_negative() {
            return Err(PostingError::InvalidDocument(format!(
                "Cannot add negative stock: quantity {}, amount {}",
                quantity, amount
            )));
        }

        let mut balance = Self::get_or_create(tx, item, account).await?;
        balance.quantity += quantity;
        balance.total_amount += amount;
        balance.last_updated = Some(Utc::now());
        tx.update_balance(&balance).await?;

        debug!(
            item = %item,
            account,
            %quantity,
            %amount,
            new_quantity = %balance.quantity,
            "Stock added"
        );
        Ok(balance)
    }

    /// Decreases quantity by `quantity` and value by `cost_amount`
    ///
    /// The sufficiency check and the write happen on the row locked by
    /// `get_or_create`, so no concurrent posting can slip in between.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::InsufficientStock` if `quantity` exceeds the
    /// balance quantity; the balance is left untouched.
    pub async fn remove_stock<T: LedgerTransaction>(
        tx: &mut T,
        item: NomenclatureId,
        item_name: &str,
        account: &str,
        quantity: Decimal,
        cost_amount: Money,
    ) -> Result<InventoryBalance, PostingError> {
        let mut balance = Self::get_or_create(tx, item, account).await?;

        if quantity > balance.quantity {
            return Err(PostingError::InsufficientStock {
                item,
                item_name: item_name.to_string(),
                account: account.to_string(),
                available: balance.quantity,
                requested: quantity,
            });
        }

        balance.quantity -= quantity;
        balance.total_amount -= cost_amount;
        balance.last_updated = Some(Utc::now());
        tx.update_balance(&balance).await?;

        debug!(
            item = %item,
            account,
            %quantity,
            cost = %cost_amount,
            new_quantity = %balance.quantity,
            "Stock removed"
        );
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_balance() {
        let balance = InventoryBalance::empty(NomenclatureId::new(), "281");
        assert_eq!(balance.quantity, Decimal::ZERO);
        assert!(balance.total_amount.is_zero());
        assert!(balance.last_updated.is_none());
    }
}
