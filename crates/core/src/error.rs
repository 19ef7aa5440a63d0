//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level failure.
///
/// These are deterministic business outcomes (unknown ids, bad input, policy
/// refusals). The allocation services fold them into their outcome values
/// instead of returning them as `Err`; storage failures live in `wms-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An order, line item or SKU does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A value failed a domain range check (e.g. negative quantity).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The complete-delivery requirement of an order cannot be met.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// A capacity correction could not honor existing commitments.
    #[error("capacity shortfall: {0}")]
    CapacityShortfall(String),
}

/// Discriminant of [`DomainError`], cheap to copy into outcomes and logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    InvalidInput,
    PolicyViolation,
    CapacityShortfall,
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::PolicyViolation(msg.into())
    }

    pub fn shortfall(msg: impl Into<String>) -> Self {
        Self::CapacityShortfall(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::PolicyViolation(_) => FailureKind::PolicyViolation,
            Self::CapacityShortfall(_) => FailureKind::CapacityShortfall,
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            FailureKind::NotFound => "not_found",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::PolicyViolation => "policy_violation",
            FailureKind::CapacityShortfall => "capacity_shortfall",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_missing_record() {
        let err = DomainError::not_found("Order ORD001");
        assert_eq!(err.to_string(), "Order ORD001 not found");
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&FailureKind::CapacityShortfall).unwrap();
        assert_eq!(json, "\"capacity_shortfall\"");
        assert_eq!(FailureKind::PolicyViolation.to_string(), "policy_violation");
    }
}
