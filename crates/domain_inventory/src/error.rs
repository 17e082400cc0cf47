//! Posting errors

use core_kernel::{DocumentId, DocumentLineId, MoneyError, NomenclatureId, PortError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that abort a posting attempt
///
/// Any of these rolls back the whole posting transaction; no balance or
/// line change from a failed attempt is ever committed.
#[derive(Debug, Error)]
pub enum PostingError {
    /// No document with the given id
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The document was posted before
    #[error("Document already posted: {0}")]
    AlreadyPosted(DocumentId),

    /// The operation type is in neither the inbound nor the outbound catalog
    #[error("Unknown operation type: {0}")]
    UnknownOperationType(String),

    /// An outbound line asks for more than the balance holds
    #[error("Insufficient stock of \"{item_name}\" on account {account}: available {available}, requested {requested}")]
    InsufficientStock {
        item: NomenclatureId,
        item_name: String,
        account: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Lost a race with a concurrent posting; the whole call may be retried
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// FIFO history ran out of inbound batches although the balance check passed
    #[error("FIFO batches exhausted for item {item} on line {line}: requested {requested}, uncovered {shortfall}")]
    FifoBatchesExhausted {
        item: NomenclatureId,
        line: DocumentLineId,
        requested: Decimal,
        shortfall: Decimal,
    },

    /// A cost could not be computed from the stored amounts
    #[error("Cost arithmetic failed: {0}")]
    Arithmetic(#[from] MoneyError),

    /// The document carries data the engine refuses to post
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The ledger store failed
    #[error("Ledger store error: {0}")]
    Store(PortError),
}

impl PostingError {
    /// Returns true if re-running the whole posting may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(self, PostingError::ConcurrencyConflict(_))
    }

    /// Returns true for failures that indicate corrupted ledger data rather
    /// than a bad request
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PostingError::FifoBatchesExhausted { .. } | PostingError::Arithmetic(_) | PostingError::Store(_)
        )
    }
}

impl From<PortError> for PostingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Conflict { message } => PostingError::ConcurrencyConflict(message),
            other => PostingError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_conflict_maps_to_retriable() {
        let error: PostingError = PortError::conflict("deadlock detected").into();
        assert!(matches!(error, PostingError::ConcurrencyConflict(_)));
        assert!(error.is_retriable());
    }

    #[test]
    fn test_other_port_errors_are_not_retriable() {
        let error: PostingError = PortError::internal("boom").into();
        assert!(matches!(error, PostingError::Store(_)));
        assert!(!error.is_retriable());
        assert!(error.is_internal());
    }

    #[test]
    fn test_arithmetic_failure_is_internal() {
        let error: PostingError = MoneyError::InvalidAmount("overflow".into()).into();
        assert!(error.is_internal());
        assert!(!error.is_retriable());
    }

    #[test]
    fn test_insufficient_stock_message() {
        let error = PostingError::InsufficientStock {
            item: NomenclatureId::new(),
            item_name: "Cable".to_string(),
            account: "281".to_string(),
            available: dec!(15),
            requested: dec!(50),
        };
        let message = error.to_string();
        assert!(message.contains("Cable"));
        assert!(message.contains("available 15"));
        assert!(message.contains("requested 50"));
        assert!(!error.is_retriable());
    }
}
