//! JSON snapshots of the stores, used by the CLI runner and in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wms_core::{LineItemId, OrderId, ProductNumber, SkuId};
use wms_inventory::Sku;
use wms_orders::{Allocation, Order};

use crate::audit::AuditEntry;
use crate::store::{AllocationStore, AuditStore, InMemoryStores, OrderStore, SkuStore, StoreError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent snapshot: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Point-in-time copy of SKUs, orders, the allocation ledger and the audit
/// trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub skus: Vec<Sku>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<AuditEntry>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let raw = self.to_json()?;
        std::fs::write(path, raw).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check quantity invariants and that the ledger agrees with SKUs and
    /// line items.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let invalid = |msg: String| SnapshotError::Invalid(msg);

        let mut skus = BTreeMap::new();
        for sku in &self.skus {
            sku.check_invariants().map_err(|e| invalid(e.to_string()))?;
            if skus.insert(sku.id_typed().clone(), sku).is_some() {
                return Err(invalid(format!("duplicate SKU {}", sku.id_typed())));
            }
        }

        let mut orders = BTreeSet::new();
        let mut lines: BTreeMap<LineItemId, (&OrderId, &ProductNumber, i64)> = BTreeMap::new();
        for order in &self.orders {
            if !orders.insert(order.id_typed().clone()) {
                return Err(invalid(format!("duplicate order {}", order.id_typed())));
            }
            for li in order.line_items() {
                if li.allocated_quantity() < 0 || li.allocated_quantity() > li.requested_quantity() {
                    return Err(invalid(format!(
                        "line item {}: allocated {} outside 0..={}",
                        li.id_typed(),
                        li.allocated_quantity(),
                        li.requested_quantity()
                    )));
                }
                if lines
                    .insert(
                        li.id_typed().clone(),
                        (order.id_typed(), li.product_number(), li.allocated_quantity()),
                    )
                    .is_some()
                {
                    return Err(invalid(format!("duplicate line item {}", li.id_typed())));
                }
            }
        }

        let mut per_sku: BTreeMap<&SkuId, i64> = BTreeMap::new();
        let mut per_line: BTreeMap<&LineItemId, i64> = BTreeMap::new();
        for a in &self.allocations {
            if a.quantity() <= 0 {
                return Err(invalid(format!(
                    "allocation {} has non-positive quantity {}",
                    a.id_typed(),
                    a.quantity()
                )));
            }
            let Some(sku) = skus.get(a.sku_id()) else {
                return Err(invalid(format!("allocation references unknown SKU {}", a.sku_id())));
            };
            let product = match lines.get(a.line_item_id()) {
                Some((order_id, product, _)) if *order_id == a.order_id() => *product,
                _ => {
                    return Err(invalid(format!(
                        "allocation references unknown line item {} of order {}",
                        a.line_item_id(),
                        a.order_id()
                    )));
                }
            };
            if sku.product_number() != product {
                return Err(invalid(format!(
                    "allocation {} draws product {} from SKU {} for line item {} of product {product}",
                    a.id_typed(),
                    sku.product_number(),
                    a.sku_id(),
                    a.line_item_id()
                )));
            }
            *per_sku.entry(a.sku_id()).or_default() += a.quantity();
            *per_line.entry(a.line_item_id()).or_default() += a.quantity();
        }

        for (id, sku) in &skus {
            let ledger = per_sku.get(id).copied().unwrap_or(0);
            if sku.allocated_quantity() != ledger {
                return Err(invalid(format!(
                    "SKU {id}: {} units committed but ledger holds {ledger}",
                    sku.allocated_quantity()
                )));
            }
        }
        for (id, (_, _, allocated)) in &lines {
            let ledger = per_line.get(id).copied().unwrap_or(0);
            if *allocated != ledger {
                return Err(invalid(format!(
                    "line item {id}: allocated {allocated} but ledger holds {ledger}"
                )));
            }
        }

        Ok(())
    }

    /// Fresh in-memory stores seeded with this snapshot.
    pub fn into_stores(self) -> Result<InMemoryStores, SnapshotError> {
        self.validate()?;
        let stores = InMemoryStores::new();
        for sku in &self.skus {
            stores.skus.save(sku)?;
        }
        for order in &self.orders {
            stores.orders.save(order)?;
        }
        stores.allocations.save_many(&self.allocations)?;
        for entry in &self.audit {
            stores.audit.record(entry)?;
        }
        Ok(stores)
    }

    /// Capture the current contents of in-memory stores.
    pub fn capture(stores: &InMemoryStores) -> Result<Self, StoreError> {
        Ok(Self {
            skus: stores.skus.list()?,
            orders: stores.orders.list()?,
            allocations: stores.allocations.list()?,
            audit: stores.audit.list_all()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wms_core::ProductNumber;
    use wms_orders::OrderPriority;

    fn consistent() -> Snapshot {
        let mut sku = Sku::new(SkuId::new("SKU001"), ProductNumber::new("P001"), 100, "A-01").unwrap();
        let mut order = Order::new(OrderId::new("ORD001"), OrderPriority::Normal, Utc::now(), false);
        order
            .add_line_item(LineItemId::new("LINE001"), ProductNumber::new("P001"), 30)
            .unwrap();
        let alloc = Allocation::new(
            OrderId::new("ORD001"),
            LineItemId::new("LINE001"),
            SkuId::new("SKU001"),
            30,
        )
        .unwrap();
        sku.take(30).unwrap();
        let li = order.line_item_mut(&LineItemId::new("LINE001")).unwrap();
        li.record_allocation(&alloc).unwrap();
        li.refresh_status();
        order.refresh_status();

        Snapshot {
            skus: vec![sku],
            orders: vec![order],
            allocations: vec![alloc],
            audit: Vec::new(),
        }
    }

    #[test]
    fn consistent_snapshot_survives_json_and_stores() {
        let snapshot = consistent();
        let raw = snapshot.to_json().unwrap();
        let parsed = Snapshot::from_json(&raw).unwrap();
        assert_eq!(parsed, snapshot);

        let stores = parsed.into_stores().unwrap();
        let captured = Snapshot::capture(&stores).unwrap();
        assert_eq!(captured, snapshot);
    }

    #[test]
    fn ledger_mismatch_is_rejected() {
        let mut snapshot = consistent();
        snapshot.allocations.clear();
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)));
    }

    #[test]
    fn dangling_allocation_is_rejected() {
        let mut snapshot = consistent();
        snapshot.orders.clear();
        assert!(matches!(snapshot.validate(), Err(SnapshotError::Invalid(_))));
    }

    fn edited(edit: impl FnOnce(&mut serde_json::Value)) -> Result<Snapshot, SnapshotError> {
        let mut raw = serde_json::to_value(consistent()).unwrap();
        edit(&mut raw);
        Snapshot::from_json(&raw.to_string())
    }

    #[test]
    fn non_positive_allocation_is_rejected() {
        let err = edited(|raw| raw["allocations"][0]["quantity"] = 0.into()).unwrap_err();
        assert!(matches!(&err, SnapshotError::Invalid(msg) if msg.contains("non-positive")), "{err}");
    }

    #[test]
    fn allocation_from_another_product_is_rejected() {
        let err = edited(|raw| raw["skus"][0]["product_number"] = "P002".into()).unwrap_err();
        assert!(matches!(&err, SnapshotError::Invalid(msg) if msg.contains("product P002")), "{err}");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("wms-snapshot-{}.json", uuid::Uuid::now_v7()));
        let snapshot = consistent();
        snapshot.write_to(&path).unwrap();
        let loaded = Snapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, snapshot);

        assert!(matches!(
            Snapshot::read_from(&path),
            Err(SnapshotError::Io { .. })
        ));
    }
}
