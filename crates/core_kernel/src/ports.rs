//! Ports and Adapters Infrastructure
//!
//! The posting engine talks to persistence only through port traits defined
//! in `domain_inventory`. Adapters (the in-memory store, the PostgreSQL store)
//! implement those traits and report failures with [`PortError`].
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            Posting Orchestrator          │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │   LedgerStore / LedgerTransaction ports  │
//! └──────────────────────────────────────────┘
//!          ▲                        ▲
//!  ┌───────┴────────┐      ┌────────┴────────┐
//!  │ In-memory store│      │ PostgreSQL store│
//!  └────────────────┘      └─────────────────┘
//! ```

use std::fmt;
use thiserror::Error;

/// Error type for port operations
///
/// Every adapter maps its native failures onto these variants so the
/// engine can decide what is retriable without knowing the backend.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The operation lost a race with a concurrent transaction
    /// (serialization failure, deadlock, lock timeout)
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// A storage constraint rejected the write
    #[error("Constraint violation: {message}")]
    Constraint {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Validation error with field information
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Constraint error
    pub fn constraint(message: impl Into<String>) -> Self {
        PortError::Constraint {
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Internal error that keeps the underlying cause
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PortError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Conflict { .. } | PortError::Connection { .. })
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// All port traits extend this marker so they are thread-safe and can be
/// shared across async tasks.
pub trait DomainPort: Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_not_found() {
        let error = PortError::not_found("Document", "123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("Document"));
        assert!(error.to_string().contains("123"));
    }

    #[test]
    fn test_port_error_transient() {
        assert!(PortError::conflict("could not serialize access").is_transient());
        assert!(PortError::connection("refused").is_transient());
        assert!(!PortError::validation("quantity must be positive").is_transient());
        assert!(!PortError::constraint("balance quantity below zero").is_transient());
    }

    #[test]
    fn test_internal_with_source_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let error = PortError::internal_with_source("write failed", cause);
        assert!(std::error::Error::source(&error).is_some());
    }
}
