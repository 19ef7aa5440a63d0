//! `wms-core`: shared building blocks for the warehouse allocation domain.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the `Entity` trait and the domain failure taxonomy.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, FailureKind};
pub use id::{AllocationId, AuditId, LineItemId, OrderId, ProductNumber, SkuId};
