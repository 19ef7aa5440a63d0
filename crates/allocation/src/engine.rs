//! Allocation engine: greedy, priority-ordered assignment of SKU stock to
//! order line items.
//!
//! ## Allocation flow
//!
//! ```text
//! Order
//!   ↓
//! 1. Complete-delivery pre-check (per product, no side effects on failure)
//!   ↓
//! 2. For each active line item: consume unlocked SKUs by warehouse location
//!   ↓
//! 3. Derive line item and order status
//!   ↓
//! 4. Persist the order and record an audit entry
//! ```
//!
//! Every consumption is persisted as soon as it happens (SKU first, then the
//! allocation record). Nothing is rolled back if a later step stops short: a
//! partially allocated order keeps what it got.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use wms_core::{DomainError, DomainResult, ProductNumber};
use wms_infra::{AuditAction, AuditTable, StoreError, Stores};
use wms_inventory::Sku;
use wms_orders::{Allocation, LineItem, Order, OrderStatus};

use crate::outcome::AllocationOutcome;

/// Capability to allocate a single order.
///
/// The correction reconciler re-allocates affected orders through this trait
/// rather than owning allocation logic of its own.
pub trait OrderAllocator: Send + Sync {
    fn allocate_order(&self, order: &mut Order) -> Result<AllocationOutcome, StoreError>;
}

/// Assigns available stock to orders.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    stores: Stores,
}

impl AllocationEngine {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Allocate stock to every active line item of `order`.
    ///
    /// - Already allocated quantity is kept; only the remainder is requested.
    /// - With complete delivery required, the order is rejected up front
    ///   (status `NotAllocated`, no allocation made) when any product's
    ///   remaining need exceeds what unlocked SKUs hold.
    /// - The outcome reports success only when the order ends fully allocated.
    ///   Partial allocations stay committed.
    ///
    /// `order` is updated in place and persisted.
    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), priority = %order.priority()),
        err
    )]
    pub fn allocate_order(&self, order: &mut Order) -> Result<AllocationOutcome, StoreError> {
        let order_id = order.id_typed().clone();
        let before = order.status();

        if before == OrderStatus::Cancelled {
            return Ok(AllocationOutcome::unfulfilled(
                order_id.clone(),
                before,
                DomainError::invalid_input(format!("order {order_id} is cancelled")),
                Vec::new(),
            ));
        }

        if order.complete_delivery_required() {
            if let Some(shortage) = self.complete_delivery_shortage(order)? {
                order.reject_incomplete();
                self.stores.orders.update(order)?;
                self.record_audit(order, before, 0, Some(shortage.as_str()))?;
                warn!(reason = %shortage, "complete delivery cannot be met");
                return Ok(AllocationOutcome::unfulfilled(
                    order_id,
                    order.status(),
                    DomainError::policy(shortage),
                    Vec::new(),
                ));
            }
        }

        let mut created = Vec::new();
        for line in order.line_items_mut() {
            if !line.is_active() {
                continue;
            }
            self.allocate_line(line, &mut created)?;
            line.refresh_status();
        }
        order.refresh_status();
        self.stores.orders.update(order)?;

        let allocated: i64 = created.iter().map(Allocation::quantity).sum();
        self.record_audit(order, before, allocated, None)?;

        let status = order.status();
        info!(%status, allocated, allocations = created.len(), "order allocated");

        if status.is_fulfilled() {
            return Ok(AllocationOutcome::fulfilled(order_id, status, created));
        }

        let (requested, held) = order
            .line_items()
            .iter()
            .filter(|li| li.is_active())
            .fold((0, 0), |(r, h), li| {
                (r + li.requested_quantity(), h + li.allocated_quantity())
            });
        let error = if status == OrderStatus::PartiallyAllocated {
            DomainError::shortfall(format!(
                "order {order_id} partially allocated: {held} of {requested} units"
            ))
        } else {
            DomainError::shortfall(format!("order {order_id} could not be allocated: no stock available"))
        };
        Ok(AllocationOutcome::unfulfilled(order_id, status, error, created))
    }

    /// Allocate every order waiting for stock.
    ///
    /// Orders are served by priority (highest first), then placement time
    /// (oldest first), then order id. Outcomes are returned in processing
    /// order.
    #[instrument(skip(self), err)]
    pub fn process_released_orders(&self) -> Result<Vec<AllocationOutcome>, StoreError> {
        let mut orders = self.stores.orders.get_releasable()?;
        orders.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.placed_at().cmp(&b.placed_at()))
                .then_with(|| a.id_typed().cmp(b.id_typed()))
        });

        let mut outcomes = Vec::with_capacity(orders.len());
        for mut order in orders {
            outcomes.push(self.allocate_order(&mut order)?);
        }

        let fulfilled = outcomes.iter().filter(|o| o.success).count();
        info!(processed = outcomes.len(), fulfilled, "released orders processed");
        Ok(outcomes)
    }

    /// First product whose combined remaining need exceeds unlocked stock.
    fn complete_delivery_shortage(&self, order: &Order) -> Result<Option<String>, StoreError> {
        let mut needs: BTreeMap<&ProductNumber, i64> = BTreeMap::new();
        for line in order.line_items().iter().filter(|li| li.is_active()) {
            *needs.entry(line.product_number()).or_default() += line.remaining_quantity();
        }

        for (product, need) in needs {
            if need <= 0 {
                continue;
            }
            let available: i64 = self
                .stores
                .skus
                .get_available_by_product(product)?
                .iter()
                .map(Sku::available_quantity)
                .sum();
            if need > available {
                return Ok(Some(format!(
                    "insufficient stock for complete delivery of order {}: product {product} needs {need}, {available} available",
                    order.id_typed()
                )));
            }
        }
        Ok(None)
    }

    /// Greedily consume SKUs for one line item, persisting each consumption.
    fn allocate_line(&self, line: &mut LineItem, created: &mut Vec<Allocation>) -> Result<(), StoreError> {
        if line.remaining_quantity() <= 0 {
            return Ok(());
        }

        let candidates = self.stores.skus.get_available_by_product(line.product_number())?;
        for mut sku in candidates {
            let remaining = line.remaining_quantity();
            if remaining <= 0 {
                break;
            }
            let quantity = remaining.min(sku.available_quantity());
            if quantity <= 0 || !sku.can_allocate(quantity) {
                continue;
            }

            let allocation = match commit(&mut sku, line, quantity) {
                Ok(a) => a,
                Err(err) => {
                    warn!(sku_id = %sku.id_typed(), %err, "skipping SKU");
                    continue;
                }
            };
            self.stores.skus.update(&sku)?;
            self.stores.allocations.save(&allocation)?;
            debug!(
                line_item_id = %line.id_typed(),
                sku_id = %sku.id_typed(),
                quantity,
                "stock allocated"
            );
            created.push(allocation);
        }
        Ok(())
    }

    fn record_audit(
        &self,
        order: &Order,
        before: OrderStatus,
        allocated: i64,
        reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let audit = &self.stores.audit;
        let mut entry = audit
            .entry(AuditTable::Orders, order.id_typed().as_str(), AuditAction::Allocate)
            .with_change(
                json!({ "status": before }),
                json!({ "status": order.status(), "allocated_quantity": allocated }),
            );
        if let Some(reason) = reason {
            entry = entry.with_reason(reason);
        }
        audit.record(entry)
    }
}

/// Take `quantity` from `sku` for `line`, returning the new ledger record.
fn commit(sku: &mut Sku, line: &mut LineItem, quantity: i64) -> DomainResult<Allocation> {
    let allocation = Allocation::new(
        line.order_id().clone(),
        line.id_typed().clone(),
        sku.id_typed().clone(),
        quantity,
    )?;
    sku.take(quantity)?;
    line.record_allocation(&allocation)?;
    Ok(allocation)
}

impl OrderAllocator for AllocationEngine {
    fn allocate_order(&self, order: &mut Order) -> Result<AllocationOutcome, StoreError> {
        AllocationEngine::allocate_order(self, order)
    }
}
