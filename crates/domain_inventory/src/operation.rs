//! Operation type classification

use std::collections::BTreeSet;
use std::fmt;

use core_kernel::CoreError;
use serde::{Deserialize, Serialize};

use crate::config::PostingConfig;
use crate::error::PostingError;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Sign applied to quantities: +1 inbound, -1 outbound
    pub fn modifier(&self) -> i8 {
        match self {
            Direction::Inbound => 1,
            Direction::Outbound => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// Maps operation type tags onto stock directions
///
/// Holds the two disjoint catalogs; classification itself is pure.
#[derive(Debug, Clone)]
pub struct OperationClassifier {
    inbound: BTreeSet<String>,
    outbound: BTreeSet<String>,
}

impl OperationClassifier {
    /// Builds a classifier from the configured catalogs
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` if a tag appears in both catalogs.
    pub fn new(
        inbound: impl IntoIterator<Item = impl Into<String>>,
        outbound: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, CoreError> {
        let inbound: BTreeSet<String> = inbound.into_iter().map(Into::into).collect();
        let outbound: BTreeSet<String> = outbound.into_iter().map(Into::into).collect();

        if let Some(tag) = inbound.intersection(&outbound).next() {
            return Err(CoreError::configuration(format!(
                "Operation type '{}' is listed as both inbound and outbound",
                tag
            )));
        }

        Ok(Self { inbound, outbound })
    }

    pub fn from_config(config: &PostingConfig) -> Result<Self, CoreError> {
        Self::new(config.inbound_types.iter().cloned(), config.outbound_types.iter().cloned())
    }

    /// Classifies an operation type
    ///
    /// # Errors
    ///
    /// Returns `PostingError::UnknownOperationType` for tags in neither catalog.
    pub fn classify(&self, operation_type: &str) -> Result<Direction, PostingError> {
        if self.inbound.contains(operation_type) {
            Ok(Direction::Inbound)
        } else if self.outbound.contains(operation_type) {
            Ok(Direction::Outbound)
        } else {
            Err(PostingError::UnknownOperationType(operation_type.to_string()))
        }
    }

    /// Inbound catalog, sorted, for store range queries
    pub fn inbound_types(&self) -> Vec<String> {
        self.inbound.iter().cloned().collect()
    }

    /// Outbound catalog, sorted, for store range queries
    pub fn outbound_types(&self) -> Vec<String> {
        self.outbound.iter().cloned().collect()
    }
}

impl Default for OperationClassifier {
    fn default() -> Self {
        let config = PostingConfig::default();
        Self {
            inbound: config.inbound_types.into_iter().collect(),
            outbound: config.outbound_types.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_catalogs() {
        let classifier = OperationClassifier::default();
        assert_eq!(classifier.classify("Purchase").unwrap(), Direction::Inbound);
        assert_eq!(classifier.classify("Прибуткова накладна").unwrap(), Direction::Inbound);
        assert_eq!(classifier.classify("Sale").unwrap(), Direction::Outbound);
        assert_eq!(classifier.classify("Видаткова накладна").unwrap(), Direction::Outbound);
    }

    #[test]
    fn test_classify_unknown() {
        let classifier = OperationClassifier::default();
        let result = classifier.classify("Tax invoice");
        assert!(matches!(result, Err(PostingError::UnknownOperationType(tag)) if tag == "Tax invoice"));
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let classifier = OperationClassifier::default();
        assert!(classifier.classify("purchase").is_err());
    }

    #[test]
    fn test_overlapping_catalogs_rejected() {
        let result = OperationClassifier::new(["Transfer", "Purchase"], ["Transfer"]);
        assert!(matches!(result, Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_direction_modifier() {
        assert_eq!(Direction::Inbound.modifier(), 1);
        assert_eq!(Direction::Outbound.modifier(), -1);
    }
}
