//! Infrastructure layer: store contracts, in-memory stores, audit trail,
//! snapshots and configuration.

pub mod audit;
pub mod config;
pub mod snapshot;
pub mod store;

pub use audit::{AuditAction, AuditEntry, AuditTable, AuditTrail};
pub use config::{LogFormat, RunnerConfig};
pub use snapshot::{Snapshot, SnapshotError};
pub use store::{
    AllocationStore, AuditStore, InMemoryAllocationStore, InMemoryAuditStore, InMemoryOrderStore,
    InMemorySkuStore, InMemoryStores, OrderStore, SkuStore, StoreError, StoreResult, Stores,
};
