//! Cancellation of whole orders or single line items.

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use wms_core::{DomainError, LineItemId, OrderId};
use wms_infra::{AuditAction, AuditTable, StoreError, Stores};
use wms_orders::{Allocation, Order, OrderStatus};

use crate::outcome::CancellationOutcome;

/// Totals of one release pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Released {
    pub allocations: usize,
    pub quantity: i64,
}

/// Return each allocation's quantity to its SKU and delete the record.
///
/// Availability is capped at the SKU total. A SKU that no longer exists is
/// skipped, but its allocation record is still deleted.
pub(crate) fn release_allocations(
    stores: &Stores,
    allocations: &[Allocation],
) -> Result<Released, StoreError> {
    let mut released = Released::default();
    for allocation in allocations {
        match stores.skus.get(allocation.sku_id())? {
            Some(mut sku) => {
                let restored = sku.release(allocation.quantity());
                stores.skus.update(&sku)?;
                released.quantity += restored;
                debug!(
                    sku_id = %allocation.sku_id(),
                    allocation_id = %allocation.id_typed(),
                    restored,
                    "stock released"
                );
            }
            None => warn!(
                sku_id = %allocation.sku_id(),
                allocation_id = %allocation.id_typed(),
                "SKU missing, dropping allocation without release"
            ),
        }
        stores.allocations.delete(allocation.id_typed())?;
        released.allocations += 1;
    }
    Ok(released)
}

/// Releases the stock held by cancelled orders and line items.
#[derive(Debug, Clone)]
pub struct CancellationCoordinator {
    stores: Stores,
}

impl CancellationCoordinator {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Cancel an order: release every allocation it holds and mark it and all
    /// of its line items `Cancelled`.
    #[instrument(skip_all, fields(order_id = %order_id), err)]
    pub fn cancel_order(&self, order_id: &OrderId) -> Result<CancellationOutcome, StoreError> {
        let Some(mut order) = self.stores.orders.get(order_id)? else {
            warn!("order not found");
            return Ok(CancellationOutcome::failed(
                order_id.clone(),
                None,
                DomainError::not_found(format!("Order {order_id}")),
            ));
        };

        let before = order.status();
        let allocations = self.stores.allocations.get_by_order(order_id)?;
        let released = release_allocations(&self.stores, &allocations)?;

        order.cancel();
        self.stores.orders.update(&order)?;
        self.record_audit(AuditTable::Orders, order_id.as_str(), &order, before, released)?;

        info!(
            released_allocations = released.allocations,
            released_quantity = released.quantity,
            "order cancelled"
        );
        Ok(CancellationOutcome {
            order_id: order_id.clone(),
            line_item_id: None,
            success: true,
            message: format!(
                "Order {order_id} cancelled successfully. Released {} allocations.",
                released.allocations
            ),
            failure: None,
            released_allocations: released.allocations,
            released_quantity: released.quantity,
            order_status: Some(order.status()),
        })
    }

    /// Cancel one line item and re-derive the order status from the lines
    /// that remain active.
    #[instrument(
        skip_all,
        fields(order_id = %order_id, line_item_id = %line_item_id),
        err
    )]
    pub fn cancel_line_item(
        &self,
        order_id: &OrderId,
        line_item_id: &LineItemId,
    ) -> Result<CancellationOutcome, StoreError> {
        let Some(mut order) = self.stores.orders.get(order_id)? else {
            warn!("order not found");
            return Ok(CancellationOutcome::failed(
                order_id.clone(),
                Some(line_item_id.clone()),
                DomainError::not_found(format!("Order {order_id}")),
            ));
        };
        if order.line_item(line_item_id).is_none() {
            warn!("line item not found");
            return Ok(CancellationOutcome::failed(
                order_id.clone(),
                Some(line_item_id.clone()),
                DomainError::not_found(format!("Line item {line_item_id} in order {order_id}")),
            ));
        }

        let before = order.status();
        let allocations: Vec<Allocation> = self
            .stores
            .allocations
            .get_by_line_item(line_item_id)?
            .into_iter()
            .filter(|a| a.order_id() == order_id)
            .collect();
        let released = release_allocations(&self.stores, &allocations)?;

        if let Some(line) = order.line_item_mut(line_item_id) {
            line.cancel();
        }
        order.refresh_status();
        self.stores.orders.update(&order)?;
        self.record_audit(AuditTable::LineItems, line_item_id.as_str(), &order, before, released)?;

        info!(
            released_allocations = released.allocations,
            order_status = %order.status(),
            "line item cancelled"
        );
        Ok(CancellationOutcome {
            order_id: order_id.clone(),
            line_item_id: Some(line_item_id.clone()),
            success: true,
            message: format!(
                "Line item {line_item_id} cancelled. Released {} allocations.",
                released.allocations
            ),
            failure: None,
            released_allocations: released.allocations,
            released_quantity: released.quantity,
            order_status: Some(order.status()),
        })
    }

    fn record_audit(
        &self,
        table: AuditTable,
        record_id: &str,
        order: &Order,
        before: OrderStatus,
        released: Released,
    ) -> Result<(), StoreError> {
        let audit = &self.stores.audit;
        let entry = audit
            .entry(table, record_id, AuditAction::Cancel)
            .with_change(
                json!({ "order_status": before }),
                json!({
                    "order_status": order.status(),
                    "released_allocations": released.allocations,
                    "released_quantity": released.quantity,
                }),
            );
        audit.record(entry)
    }
}
