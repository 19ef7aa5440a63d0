use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{AllocationId, DomainError, DomainResult, Entity, LineItemId, OrderId, ProductNumber};

use crate::allocation::Allocation;
use crate::status::{LineItemStatus, OrderStatus, derive_line_item_status, derive_order_status};

/// Priority tier of an order. Higher tiers are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPriority {
    Low,
    Normal,
    High,
}

impl core::fmt::Display for OrderPriority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderPriority::Low => "low",
            OrderPriority::Normal => "normal",
            OrderPriority::High => "high",
        };
        f.write_str(s)
    }
}

/// One product/quantity request within an order.
///
/// Invariant: `0 <= allocated_quantity <= requested_quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: LineItemId,
    order_id: OrderId,
    product_number: ProductNumber,
    requested_quantity: i64,
    allocated_quantity: i64,
    status: LineItemStatus,
    #[serde(default)]
    allocations: Vec<AllocationId>,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

impl LineItem {
    pub fn id_typed(&self) -> &LineItemId {
        &self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn product_number(&self) -> &ProductNumber {
        &self.product_number
    }

    pub fn requested_quantity(&self) -> i64 {
        self.requested_quantity
    }

    pub fn allocated_quantity(&self) -> i64 {
        self.allocated_quantity
    }

    /// Quantity still to be allocated.
    pub fn remaining_quantity(&self) -> i64 {
        self.requested_quantity - self.allocated_quantity
    }

    pub fn status(&self) -> LineItemStatus {
        self.status
    }

    pub fn allocations(&self) -> &[AllocationId] {
        &self.allocations
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub fn is_active(&self) -> bool {
        self.status != LineItemStatus::Cancelled
    }

    /// Attach a freshly created allocation to this line item.
    pub fn record_allocation(&mut self, allocation: &Allocation) -> DomainResult<()> {
        if allocation.line_item_id() != &self.id {
            return Err(DomainError::invalid_input(format!(
                "allocation for line item {} recorded on {}",
                allocation.line_item_id(),
                self.id
            )));
        }
        if allocation.quantity() > self.remaining_quantity() {
            return Err(DomainError::invalid_input(format!(
                "line item {}: allocating {} exceeds remaining {}",
                self.id,
                allocation.quantity(),
                self.remaining_quantity()
            )));
        }
        self.allocated_quantity += allocation.quantity();
        self.allocations.push(allocation.id_typed());
        self.touch();
        Ok(())
    }

    /// Re-derive status from quantities (no-op for cancelled items).
    pub fn refresh_status(&mut self) {
        if self.is_active() {
            self.status = derive_line_item_status(self.requested_quantity, self.allocated_quantity);
            self.touch();
        }
    }

    /// Drop every allocation reference and return to `Pending`.
    pub fn rewind(&mut self) {
        self.allocated_quantity = 0;
        self.allocations.clear();
        self.status = LineItemStatus::Pending;
        self.touch();
    }

    pub fn cancel(&mut self) {
        self.allocated_quantity = 0;
        self.allocations.clear();
        self.status = LineItemStatus::Cancelled;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_modified_at = Utc::now();
    }
}

/// A customer demand for one or more products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    priority: OrderPriority,
    placed_at: DateTime<Utc>,
    complete_delivery_required: bool,
    status: OrderStatus,
    line_items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

impl Order {
    /// A newly received order with no line items.
    pub fn new(
        id: OrderId,
        priority: OrderPriority,
        placed_at: DateTime<Utc>,
        complete_delivery_required: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            priority,
            placed_at,
            complete_delivery_required,
            status: OrderStatus::Received,
            line_items: Vec::new(),
            created_at: now,
            last_modified_at: now,
        }
    }

    /// Append a pending line item.
    pub fn add_line_item(
        &mut self,
        id: LineItemId,
        product_number: ProductNumber,
        requested_quantity: i64,
    ) -> DomainResult<&LineItem> {
        if requested_quantity < 0 {
            return Err(DomainError::invalid_input("requested quantity cannot be negative"));
        }
        if self.line_items.iter().any(|li| li.id == id) {
            return Err(DomainError::invalid_input(format!(
                "line item {id} already exists in order {}",
                self.id
            )));
        }
        let now = Utc::now();
        self.line_items.push(LineItem {
            id,
            order_id: self.id.clone(),
            product_number,
            requested_quantity,
            allocated_quantity: 0,
            status: LineItemStatus::Pending,
            allocations: Vec::new(),
            created_at: now,
            last_modified_at: now,
        });
        self.touch();
        let last = self.line_items.len() - 1;
        Ok(&self.line_items[last])
    }

    pub fn id_typed(&self) -> &OrderId {
        &self.id
    }

    pub fn priority(&self) -> OrderPriority {
        self.priority
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn complete_delivery_required(&self) -> bool {
        self.complete_delivery_required
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_items_mut(&mut self) -> impl Iterator<Item = &mut LineItem> {
        self.line_items.iter_mut()
    }

    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|li| &li.id == id)
    }

    pub fn line_item_mut(&mut self, id: &LineItemId) -> Option<&mut LineItem> {
        self.line_items.iter_mut().find(|li| &li.id == id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub fn is_releasable(&self) -> bool {
        self.status.is_releasable()
    }

    /// Re-derive order status from line items.
    pub fn refresh_status(&mut self) {
        self.status = derive_order_status(self.line_items.iter().map(LineItem::status));
        self.touch();
    }

    /// Complete delivery cannot be honored; nothing is committed.
    pub fn reject_incomplete(&mut self) {
        self.status = OrderStatus::NotAllocated;
        self.touch();
    }

    /// Cancel the whole order and every line item.
    pub fn cancel(&mut self) {
        for li in &mut self.line_items {
            li.cancel();
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_modified_at = Utc::now();
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
