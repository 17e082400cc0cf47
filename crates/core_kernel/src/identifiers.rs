//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs keep document, line and item identifiers
//! from being mixed up. Identifiers order by their UUID bytes, which is the
//! same order PostgreSQL uses for `uuid` columns; posting order relies on it
//! to break ties between documents sharing a timestamp.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Document identifiers
define_id!(DocumentId, "DOC");
define_id!(DocumentLineId, "LINE");

// Reference data identifiers
define_id!(NomenclatureId, "NOM");
define_id!(CounterpartyId, "CPT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_display() {
        let id = DocumentId::new();
        let display = id.to_string();
        assert!(display.starts_with("DOC-"));
    }

    #[test]
    fn test_id_parsing() {
        let original = NomenclatureId::new();
        let parsed: NomenclatureId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: NomenclatureId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let document_id = DocumentId::from(uuid);
        let back: Uuid = document_id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn test_ordering_follows_uuid_bytes() {
        let low = DocumentId::from_uuid(Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap());
        let high = DocumentId::from_uuid(Uuid::parse_str("00000000-0000-4000-8000-000000000002").unwrap());
        assert!(low < high);
    }
}
