//! Data-access contracts consumed by the allocation services.
//!
//! The services make no storage assumptions: they read and write orders, SKUs
//! and allocation records only through these traits. Every call is a single
//! read or write; implementations are expected to serialize mutations per
//! order/SKU (the services do no locking or retries of their own).

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use wms_core::{AllocationId, LineItemId, OrderId, ProductNumber, SkuId};
use wms_inventory::Sku;
use wms_orders::{Allocation, Order};

use crate::audit::{AuditEntry, AuditTable, AuditTrail};

pub use in_memory::{
    InMemoryAllocationStore, InMemoryAuditStore, InMemoryOrderStore, InMemorySkuStore,
    InMemoryStores,
};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// These are **infrastructure errors**: the services cannot compensate for
/// them and propagate them untouched. Missing business records are reported as
/// `None`/empty results instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("record missing: {0}")]
    Missing(String),
}

/// Orders with their line items.
pub trait OrderStore: Send + Sync {
    fn get(&self, order_id: &OrderId) -> StoreResult<Option<Order>>;

    /// Orders waiting for allocation (`Received` or `NotAllocated`).
    fn get_releasable(&self) -> StoreResult<Vec<Order>>;

    /// Insert a new order.
    fn save(&self, order: &Order) -> StoreResult<()>;

    /// Replace an existing order.
    fn update(&self, order: &Order) -> StoreResult<()>;
}

/// SKU records.
pub trait SkuStore: Send + Sync {
    fn get(&self, sku_id: &SkuId) -> StoreResult<Option<Sku>>;

    /// Every SKU stocking a product, locked or not.
    fn get_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>>;

    /// Unlocked SKUs with available stock, ordered by warehouse location
    /// (ties broken by SKU id).
    fn get_available_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>>;

    /// Insert a new SKU.
    fn save(&self, sku: &Sku) -> StoreResult<()>;

    fn update(&self, sku: &Sku) -> StoreResult<()>;

    fn update_many(&self, skus: &[Sku]) -> StoreResult<()>;
}

/// Allocation ledger.
pub trait AllocationStore: Send + Sync {
    fn save(&self, allocation: &Allocation) -> StoreResult<()>;

    fn save_many(&self, allocations: &[Allocation]) -> StoreResult<()>;

    fn get_by_order(&self, order_id: &OrderId) -> StoreResult<Vec<Allocation>>;

    fn get_by_line_item(&self, line_item_id: &LineItemId) -> StoreResult<Vec<Allocation>>;

    fn get_by_sku(&self, sku_id: &SkuId) -> StoreResult<Vec<Allocation>>;

    /// Delete one record. Deleting an unknown id is a no-op.
    fn delete(&self, allocation_id: AllocationId) -> StoreResult<()>;

    fn delete_many(&self, allocation_ids: &[AllocationId]) -> StoreResult<()>;
}

/// Append-only audit log.
pub trait AuditStore: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> StoreResult<()>;

    fn list_for(&self, table: AuditTable, record_id: &str) -> StoreResult<Vec<AuditEntry>>;

    fn list_all(&self) -> StoreResult<Vec<AuditEntry>>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn get(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        (**self).get(order_id)
    }

    fn get_releasable(&self) -> StoreResult<Vec<Order>> {
        (**self).get_releasable()
    }

    fn save(&self, order: &Order) -> StoreResult<()> {
        (**self).save(order)
    }

    fn update(&self, order: &Order) -> StoreResult<()> {
        (**self).update(order)
    }
}

impl<S> SkuStore for Arc<S>
where
    S: SkuStore + ?Sized,
{
    fn get(&self, sku_id: &SkuId) -> StoreResult<Option<Sku>> {
        (**self).get(sku_id)
    }

    fn get_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>> {
        (**self).get_by_product(product_number)
    }

    fn get_available_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>> {
        (**self).get_available_by_product(product_number)
    }

    fn save(&self, sku: &Sku) -> StoreResult<()> {
        (**self).save(sku)
    }

    fn update(&self, sku: &Sku) -> StoreResult<()> {
        (**self).update(sku)
    }

    fn update_many(&self, skus: &[Sku]) -> StoreResult<()> {
        (**self).update_many(skus)
    }
}

impl<S> AllocationStore for Arc<S>
where
    S: AllocationStore + ?Sized,
{
    fn save(&self, allocation: &Allocation) -> StoreResult<()> {
        (**self).save(allocation)
    }

    fn save_many(&self, allocations: &[Allocation]) -> StoreResult<()> {
        (**self).save_many(allocations)
    }

    fn get_by_order(&self, order_id: &OrderId) -> StoreResult<Vec<Allocation>> {
        (**self).get_by_order(order_id)
    }

    fn get_by_line_item(&self, line_item_id: &LineItemId) -> StoreResult<Vec<Allocation>> {
        (**self).get_by_line_item(line_item_id)
    }

    fn get_by_sku(&self, sku_id: &SkuId) -> StoreResult<Vec<Allocation>> {
        (**self).get_by_sku(sku_id)
    }

    fn delete(&self, allocation_id: AllocationId) -> StoreResult<()> {
        (**self).delete(allocation_id)
    }

    fn delete_many(&self, allocation_ids: &[AllocationId]) -> StoreResult<()> {
        (**self).delete_many(allocation_ids)
    }
}

impl<S> AuditStore for Arc<S>
where
    S: AuditStore + ?Sized,
{
    fn record(&self, entry: &AuditEntry) -> StoreResult<()> {
        (**self).record(entry)
    }

    fn list_for(&self, table: AuditTable, record_id: &str) -> StoreResult<Vec<AuditEntry>> {
        (**self).list_for(table, record_id)
    }

    fn list_all(&self) -> StoreResult<Vec<AuditEntry>> {
        (**self).list_all()
    }
}

/// The set of collaborators every allocation service works against.
#[derive(Clone)]
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub skus: Arc<dyn SkuStore>,
    pub allocations: Arc<dyn AllocationStore>,
    pub audit: AuditTrail,
}

impl Stores {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        skus: Arc<dyn SkuStore>,
        allocations: Arc<dyn AllocationStore>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            orders,
            skus,
            allocations,
            audit,
        }
    }
}

impl core::fmt::Debug for Stores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stores")
            .field("audit_actor", &self.audit.actor())
            .finish_non_exhaustive()
    }
}
