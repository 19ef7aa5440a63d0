//! Strongly-typed identifiers used across the domain.
//!
//! Orders, line items, SKUs and product numbers carry business keys assigned
//! outside the core ("ORD001", "SKU-A-01"), so they wrap a `String`. Records
//! the core creates itself (allocations, audit entries) get UUIDv7 ids.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a customer order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

/// Identifier of a line item within an order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(String);

/// Identifier of a SKU record (one product at one warehouse location).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(String);

/// Product number shared by every SKU that stocks the same product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductNumber(String);

/// Identifier of an allocation ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(Uuid);

/// Identifier of an audit entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(Uuid);

macro_rules! impl_key_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_input(concat!($name, " cannot be empty")));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_input(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_key_newtype!(OrderId, "OrderId");
impl_key_newtype!(LineItemId, "LineItemId");
impl_key_newtype!(SkuId, "SkuId");
impl_key_newtype!(ProductNumber, "ProductNumber");

impl_uuid_newtype!(AllocationId, "AllocationId");
impl_uuid_newtype!(AuditId, "AuditId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_keys_parse_trimmed_and_reject_blank() {
        let id: SkuId = "  SKU001 ".parse().unwrap();
        assert_eq!(id.as_str(), "SKU001");

        let err = "   ".parse::<OrderId>().unwrap_err();
        assert_eq!(err, DomainError::invalid_input("OrderId cannot be empty"));
    }

    #[test]
    fn business_keys_serialize_transparently() {
        let id = ProductNumber::new("P001");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P001\"");
    }

    #[test]
    fn allocation_ids_are_unique_and_parse_back() {
        let first = AllocationId::new();
        let second = AllocationId::new();
        assert_ne!(first, second);
        assert_eq!(first.to_string().parse::<AllocationId>().unwrap(), first);
        assert!("not-a-uuid".parse::<AllocationId>().is_err());
    }
}
