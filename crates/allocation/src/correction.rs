//! SKU capacity correction with re-allocation of affected orders.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use wms_core::{DomainError, OrderId, SkuId};
use wms_infra::{AuditAction, AuditTable, StoreError, Stores};
use wms_inventory::Sku;
use wms_orders::Allocation;

use crate::cancellation::release_allocations;
use crate::engine::OrderAllocator;
use crate::outcome::{AllocationOutcome, CorrectionOutcome};

/// Corrects SKU totals after a recount.
///
/// When the new total still covers every unit committed against the SKU, the
/// correction only moves the total and availability. Otherwise every order
/// holding that SKU has its lines for the SKU's product rewound (all of their
/// allocations released, on any SKU), the total is shrunk, and each affected
/// order is handed back to the allocator to find substitutes.
#[derive(Clone)]
pub struct CorrectionReconciler {
    stores: Stores,
    allocator: Arc<dyn OrderAllocator>,
}

impl CorrectionReconciler {
    pub fn new(stores: Stores, allocator: Arc<dyn OrderAllocator>) -> Self {
        Self { stores, allocator }
    }

    #[instrument(skip_all, fields(sku_id = %sku_id, new_total = new_total), err)]
    pub fn correct_sku_quantity(
        &self,
        sku_id: &SkuId,
        new_total: i64,
    ) -> Result<CorrectionOutcome, StoreError> {
        if new_total < 0 {
            return Ok(CorrectionOutcome::failed(
                sku_id.clone(),
                new_total,
                DomainError::invalid_input("quantity cannot be negative"),
            ));
        }
        let Some(mut sku) = self.stores.skus.get(sku_id)? else {
            warn!("SKU not found");
            return Ok(CorrectionOutcome::failed(
                sku_id.clone(),
                new_total,
                DomainError::not_found(format!("SKU {sku_id}")),
            ));
        };

        let before = sku.clone();
        let allocations = self.stores.allocations.get_by_sku(sku_id)?;
        let committed: i64 = allocations.iter().map(Allocation::quantity).sum();

        if allocations.is_empty() || new_total >= committed {
            if let Err(err) = sku.correct_total(new_total, committed) {
                return Ok(CorrectionOutcome::failed(sku_id.clone(), new_total, err));
            }
            self.stores.skus.update(&sku)?;
            self.record_correction(&before, &sku, None)?;
            info!(committed, available = sku.available_quantity(), "SKU corrected");
            return Ok(CorrectionOutcome {
                sku_id: sku_id.clone(),
                success: true,
                message: format!(
                    "SKU {sku_id} quantity corrected from {} to {new_total}. Available quantity: {}, Allocated quantity: {committed}.",
                    before.total_quantity(),
                    sku.available_quantity()
                ),
                failure: None,
                previous_total: Some(before.total_quantity()),
                new_total,
                affected_orders: Vec::new(),
                reallocations: Vec::new(),
            });
        }

        // First-seen order of the SKU's allocation records.
        let mut affected: Vec<OrderId> = Vec::new();
        for a in &allocations {
            if !affected.contains(a.order_id()) {
                affected.push(a.order_id().clone());
            }
        }
        warn!(
            committed,
            affected_orders = affected.len(),
            "new total below commitment, rewinding affected orders"
        );

        for order_id in &affected {
            self.rewind_order(order_id, &sku)?;
        }

        let Some(mut sku) = self.stores.skus.get(sku_id)? else {
            return Err(StoreError::Missing(format!("SKU {sku_id} vanished during correction")));
        };
        if let Err(err) = sku.resize_total(new_total) {
            return Ok(CorrectionOutcome::failed(sku_id.clone(), new_total, err));
        }
        self.stores.skus.update(&sku)?;

        let mut reallocations: Vec<AllocationOutcome> = Vec::with_capacity(affected.len());
        // Strict orders left unfilled, with what they still hold on lines the
        // correction did not rewind.
        let mut stranded: Vec<(&OrderId, i64)> = Vec::new();
        for order_id in &affected {
            let Some(mut order) = self.stores.orders.get(order_id)? else {
                continue;
            };
            let outcome = self.allocator.allocate_order(&mut order)?;
            if order.complete_delivery_required() && !outcome.success {
                let held: i64 = order
                    .line_items()
                    .iter()
                    .filter(|li| li.is_active())
                    .map(|li| li.allocated_quantity())
                    .sum();
                stranded.push((order_id, held));
            }
            reallocations.push(outcome);
        }

        let reason = (!stranded.is_empty()).then(|| stranded_reason(&stranded));
        self.record_correction(&before, &sku, reason.as_deref())?;

        info!(
            reallocated = reallocations.len(),
            stranded = stranded.len(),
            "SKU corrected with reallocation"
        );

        let outcome = match reason {
            Some(reason) => CorrectionOutcome::failed(
                sku_id.clone(),
                new_total,
                DomainError::shortfall(format!(
                    "SKU {sku_id} corrected from {} to {new_total}, but {reason}",
                    before.total_quantity()
                )),
            ),
            None => CorrectionOutcome {
                sku_id: sku_id.clone(),
                success: true,
                message: format!(
                    "SKU {sku_id} quantity corrected from {} to {new_total}. Reallocated {} affected orders.",
                    before.total_quantity(),
                    affected.len()
                ),
                failure: None,
                previous_total: None,
                new_total,
                affected_orders: Vec::new(),
                reallocations: Vec::new(),
            },
        };

        Ok(CorrectionOutcome {
            previous_total: Some(before.total_quantity()),
            affected_orders: affected,
            reallocations,
            ..outcome
        })
    }

    /// Release every allocation of the order's active lines for `sku`'s
    /// product and put those lines back to `Pending`.
    fn rewind_order(&self, order_id: &OrderId, sku: &Sku) -> Result<(), StoreError> {
        let order_allocations = self.stores.allocations.get_by_order(order_id)?;
        let Some(mut order) = self.stores.orders.get(order_id)? else {
            warn!(order_id = %order_id, "order holding stock not found, releasing its allocations");
            release_allocations(&self.stores, &order_allocations)?;
            return Ok(());
        };

        let mut rewound = Vec::new();
        for line in order.line_items_mut() {
            if !line.is_active() || line.product_number() != sku.product_number() {
                continue;
            }
            let held: Vec<Allocation> = order_allocations
                .iter()
                .filter(|a| a.line_item_id() == line.id_typed())
                .cloned()
                .collect();
            let released = release_allocations(&self.stores, &held)?;
            let allocated_before = line.allocated_quantity();
            line.rewind();
            rewound.push((line.id_typed().clone(), allocated_before, released.quantity));
        }
        order.refresh_status();
        self.stores.orders.update(&order)?;

        let audit = &self.stores.audit;
        for (line_id, allocated_before, released) in rewound {
            let entry = audit
                .entry(AuditTable::LineItems, line_id.as_str(), AuditAction::Rewind)
                .with_change(
                    json!({ "allocated_quantity": allocated_before }),
                    json!({ "allocated_quantity": 0, "released_quantity": released }),
                )
                .with_reason(format!("SKU {} corrected below commitment", sku.id_typed()));
            audit.record(entry)?;
        }
        Ok(())
    }

    fn record_correction(&self, before: &Sku, after: &Sku, reason: Option<&str>) -> Result<(), StoreError> {
        let audit = &self.stores.audit;
        let mut entry = audit
            .entry(AuditTable::Skus, after.id_typed().as_str(), AuditAction::Correct)
            .with_change(
                json!({
                    "total_quantity": before.total_quantity(),
                    "available_quantity": before.available_quantity(),
                }),
                json!({
                    "total_quantity": after.total_quantity(),
                    "available_quantity": after.available_quantity(),
                }),
            );
        if let Some(reason) = reason {
            entry = entry.with_reason(reason);
        }
        audit.record(entry)
    }
}

fn stranded_reason(stranded: &[(&OrderId, i64)]) -> String {
    let ids: Vec<&str> = stranded.iter().map(|(id, _)| id.as_str()).collect();
    let mut reason = format!(
        "orders {} were deallocated for lack of substitutes",
        ids.join(", ")
    );
    let holding: Vec<String> = stranded
        .iter()
        .filter(|(_, held)| *held > 0)
        .map(|(id, held)| format!("{id} still holds {held} units on other lines"))
        .collect();
    if !holding.is_empty() {
        reason.push_str(&format!(" ({})", holding.join("; ")));
    }
    reason
}

impl core::fmt::Debug for CorrectionReconciler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CorrectionReconciler")
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}
