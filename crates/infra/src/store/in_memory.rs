use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use wms_core::{AllocationId, Entity, LineItemId, OrderId, ProductNumber, SkuId};
use wms_inventory::Sku;
use wms_orders::{Allocation, Order};

use crate::audit::{AuditEntry, AuditTable, AuditTrail};

use super::{AllocationStore, AuditStore, OrderStore, SkuStore, StoreError, StoreResult, Stores};

/// Keyed rows behind a lock; shared by every in-memory store below.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E> Table<E>
where
    E: Entity + Clone,
{
    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<E::Id, E>>> {
        self.rows
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<E::Id, E>>> {
        self.rows
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn get(&self, id: &E::Id) -> StoreResult<Option<E>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn filter(&self, mut pred: impl FnMut(&E) -> bool) -> StoreResult<Vec<E>> {
        Ok(self.read()?.values().filter(|e| pred(e)).cloned().collect())
    }

    fn all(&self) -> StoreResult<Vec<E>> {
        self.filter(|_| true)
    }

    fn insert(&self, row: &E) -> StoreResult<()> {
        let mut rows = self.write()?;
        if rows.contains_key(row.id()) {
            return Err(StoreError::Conflict(format!("{:?}", row.id())));
        }
        rows.insert(row.id().clone(), row.clone());
        Ok(())
    }

    /// Insert every row or none of them.
    fn insert_all(&self, batch: &[E]) -> StoreResult<()> {
        let mut rows = self.write()?;
        if let Some(dup) = batch.iter().find(|r| rows.contains_key(r.id())) {
            return Err(StoreError::Conflict(format!("{:?}", dup.id())));
        }
        for row in batch {
            rows.insert(row.id().clone(), row.clone());
        }
        Ok(())
    }

    fn replace(&self, row: &E) -> StoreResult<()> {
        self.replace_all(core::slice::from_ref(row))
    }

    /// Replace every row or none of them.
    fn replace_all(&self, batch: &[E]) -> StoreResult<()> {
        let mut rows = self.write()?;
        if let Some(missing) = batch.iter().find(|r| !rows.contains_key(r.id())) {
            return Err(StoreError::Missing(format!("{:?}", missing.id())));
        }
        for row in batch {
            rows.insert(row.id().clone(), row.clone());
        }
        Ok(())
    }

    fn remove_all(&self, ids: &[E::Id]) -> StoreResult<()> {
        let mut rows = self.write()?;
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }
}

/// In-memory order store for tests/dev and the snapshot runner.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    table: Table<Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> StoreResult<Vec<Order>> {
        self.table.all()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        self.table.get(order_id)
    }

    fn get_releasable(&self) -> StoreResult<Vec<Order>> {
        self.table.filter(Order::is_releasable)
    }

    fn save(&self, order: &Order) -> StoreResult<()> {
        self.table.insert(order)
    }

    fn update(&self, order: &Order) -> StoreResult<()> {
        self.table.replace(order)
    }
}

/// In-memory SKU store.
#[derive(Debug, Default)]
pub struct InMemorySkuStore {
    table: Table<Sku>,
}

impl InMemorySkuStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> StoreResult<Vec<Sku>> {
        self.table.all()
    }
}

impl SkuStore for InMemorySkuStore {
    fn get(&self, sku_id: &SkuId) -> StoreResult<Option<Sku>> {
        self.table.get(sku_id)
    }

    fn get_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>> {
        self.table.filter(|s| s.product_number() == product_number)
    }

    fn get_available_by_product(&self, product_number: &ProductNumber) -> StoreResult<Vec<Sku>> {
        let mut skus = self.table.filter(|s| {
            s.product_number() == product_number
                && !s.is_location_locked()
                && s.available_quantity() > 0
        })?;
        skus.sort_by(|a, b| {
            a.warehouse_location()
                .cmp(b.warehouse_location())
                .then_with(|| a.id_typed().cmp(b.id_typed()))
        });
        Ok(skus)
    }

    fn save(&self, sku: &Sku) -> StoreResult<()> {
        self.table.insert(sku)
    }

    fn update(&self, sku: &Sku) -> StoreResult<()> {
        self.table.replace(sku)
    }

    fn update_many(&self, skus: &[Sku]) -> StoreResult<()> {
        self.table.replace_all(skus)
    }
}

/// In-memory allocation ledger.
///
/// Lookups return records in the order they were created.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    table: Table<Allocation>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> StoreResult<Vec<Allocation>> {
        self.select(|_| true)
    }

    fn select(&self, pred: impl FnMut(&Allocation) -> bool) -> StoreResult<Vec<Allocation>> {
        let mut found = self.table.filter(pred)?;
        found.sort_by_key(|a| (a.allocated_at(), a.id_typed()));
        Ok(found)
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn save(&self, allocation: &Allocation) -> StoreResult<()> {
        self.table.insert(allocation)
    }

    fn save_many(&self, allocations: &[Allocation]) -> StoreResult<()> {
        self.table.insert_all(allocations)
    }

    fn get_by_order(&self, order_id: &OrderId) -> StoreResult<Vec<Allocation>> {
        self.select(|a| a.order_id() == order_id)
    }

    fn get_by_line_item(&self, line_item_id: &LineItemId) -> StoreResult<Vec<Allocation>> {
        self.select(|a| a.line_item_id() == line_item_id)
    }

    fn get_by_sku(&self, sku_id: &SkuId) -> StoreResult<Vec<Allocation>> {
        self.select(|a| a.sku_id() == sku_id)
    }

    fn delete(&self, allocation_id: AllocationId) -> StoreResult<()> {
        self.table.remove_all(&[allocation_id])
    }

    fn delete_many(&self, allocation_ids: &[AllocationId]) -> StoreResult<()> {
        self.table.remove_all(allocation_ids)
    }
}

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<AuditEntry>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl AuditStore for InMemoryAuditStore {
    fn record(&self, entry: &AuditEntry) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        if entries.iter().any(|e| e.audit_id == entry.audit_id) {
            return Err(StoreError::Conflict(entry.audit_id.to_string()));
        }
        entries.push(entry.clone());
        Ok(())
    }

    fn list_for(&self, table: AuditTable, record_id: &str) -> StoreResult<Vec<AuditEntry>> {
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.table_name == table && e.record_id == record_id)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.read()?.clone())
    }
}

/// A full set of in-memory stores, keeping concrete handles for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStores {
    pub orders: Arc<InMemoryOrderStore>,
    pub skus: Arc<InMemorySkuStore>,
    pub allocations: Arc<InMemoryAllocationStore>,
    pub audit: Arc<InMemoryAuditStore>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view handed to the services; audit entries are attributed
    /// to `actor`.
    pub fn stores(&self, actor: impl Into<String>) -> Stores {
        Stores::new(
            self.orders.clone(),
            self.skus.clone(),
            self.allocations.clone(),
            AuditTrail::new(self.audit.clone(), actor),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use chrono::Utc;
    use wms_orders::OrderPriority;

    fn sku(id: &str, product: &str, total: i64, location: &str) -> Sku {
        Sku::new(SkuId::new(id), ProductNumber::new(product), total, location).unwrap()
    }

    #[test]
    fn order_save_then_update() {
        let store = InMemoryOrderStore::new();
        let mut order = Order::new(OrderId::new("ORD001"), OrderPriority::Normal, Utc::now(), false);
        store.save(&order).unwrap();
        assert!(matches!(store.save(&order), Err(StoreError::Conflict(_))));

        order.cancel();
        store.update(&order).unwrap();
        let loaded = store.get(&OrderId::new("ORD001")).unwrap().unwrap();
        assert!(!loaded.is_releasable());
        assert!(store.get_releasable().unwrap().is_empty());

        let ghost = Order::new(OrderId::new("ORD404"), OrderPriority::Low, Utc::now(), false);
        assert!(matches!(store.update(&ghost), Err(StoreError::Missing(_))));
    }

    #[test]
    fn available_skus_skip_locked_and_empty_and_sort_by_location() {
        let store = InMemorySkuStore::new();
        store.save(&sku("SKU-C", "P1", 10, "B-02")).unwrap();
        store.save(&sku("SKU-B", "P1", 10, "A-01")).unwrap();
        store.save(&sku("SKU-A", "P1", 10, "A-01")).unwrap();
        store.save(&sku("SKU-L", "P1", 10, "A-00").locked(true)).unwrap();
        store.save(&sku("SKU-E", "P1", 0, "A-00")).unwrap();
        store.save(&sku("SKU-X", "P2", 10, "A-00")).unwrap();

        let ids: Vec<_> = store
            .get_available_by_product(&ProductNumber::new("P1"))
            .unwrap()
            .iter()
            .map(|s| s.id_typed().to_string())
            .collect();
        assert_eq!(ids, vec!["SKU-A", "SKU-B", "SKU-C"]);
        assert_eq!(store.get_by_product(&ProductNumber::new("P1")).unwrap().len(), 5);
    }

    #[test]
    fn update_many_is_all_or_nothing() {
        let store = InMemorySkuStore::new();
        let mut a = sku("SKU-A", "P1", 10, "A");
        store.save(&a).unwrap();
        a.take(4).unwrap();
        let ghost = sku("SKU-Z", "P1", 10, "Z");

        assert!(store.update_many(&[a.clone(), ghost]).is_err());
        let stored = store.get(&SkuId::new("SKU-A")).unwrap().unwrap();
        assert_eq!(stored.available_quantity(), 10);

        store.update_many(&[a]).unwrap();
        let stored = store.get(&SkuId::new("SKU-A")).unwrap().unwrap();
        assert_eq!(stored.available_quantity(), 6);
    }

    #[test]
    fn allocation_lookups_and_deletes() {
        let store = InMemoryAllocationStore::new();
        let a1 = Allocation::new(OrderId::new("O1"), LineItemId::new("L1"), SkuId::new("S1"), 3).unwrap();
        let a2 = Allocation::new(OrderId::new("O1"), LineItemId::new("L2"), SkuId::new("S2"), 4).unwrap();
        let a3 = Allocation::new(OrderId::new("O2"), LineItemId::new("L3"), SkuId::new("S1"), 5).unwrap();
        store.save_many(&[a1.clone(), a2.clone(), a3.clone()]).unwrap();

        assert_eq!(store.get_by_order(&OrderId::new("O1")).unwrap().len(), 2);
        assert_eq!(store.get_by_line_item(&LineItemId::new("L3")).unwrap(), vec![a3.clone()]);
        assert_eq!(store.get_by_sku(&SkuId::new("S1")).unwrap().len(), 2);

        store.delete(a1.id_typed()).unwrap();
        store.delete(a1.id_typed()).unwrap();
        store.delete_many(&[a3.id_typed()]).unwrap();
        assert_eq!(store.list().unwrap(), vec![a2]);
    }

    #[test]
    fn audit_entries_are_filtered_by_record() {
        let stores = InMemoryStores::new();
        let trail = stores.stores("tester").audit;
        trail
            .record(trail.entry(AuditTable::Orders, "O1", AuditAction::Cancel))
            .unwrap();
        trail
            .record(trail.entry(AuditTable::Skus, "S1", AuditAction::Correct))
            .unwrap();

        let for_order = stores.audit.list_for(AuditTable::Orders, "O1").unwrap();
        assert_eq!(for_order.len(), 1);
        assert_eq!(for_order[0].changed_by, "tester");
        assert_eq!(stores.audit.list_all().unwrap().len(), 2);
    }
}
