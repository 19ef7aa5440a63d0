use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{AllocationId, DomainError, DomainResult, Entity, LineItemId, OrderId, SkuId};

/// Ledger entry: `quantity` units of one SKU committed to one line item.
///
/// Allocations are never mutated; a quantity change is a delete plus a new
/// entry. Their existence is the source of truth for "how much of line item X
/// comes from SKU Y".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    id: AllocationId,
    order_id: OrderId,
    line_item_id: LineItemId,
    sku_id: SkuId,
    quantity: i64,
    allocated_at: DateTime<Utc>,
}

impl Allocation {
    pub fn new(
        order_id: OrderId,
        line_item_id: LineItemId,
        sku_id: SkuId,
        quantity: i64,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::invalid_input("allocated quantity must be positive"));
        }
        Ok(Self {
            id: AllocationId::new(),
            order_id,
            line_item_id,
            sku_id,
            quantity,
            allocated_at: Utc::now(),
        })
    }

    pub fn id_typed(&self) -> AllocationId {
        self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn line_item_id(&self) -> &LineItemId {
        &self.line_item_id
    }

    pub fn sku_id(&self) -> &SkuId {
        &self.sku_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn allocated_at(&self) -> DateTime<Utc> {
        self.allocated_at
    }
}

impl Entity for Allocation {
    type Id = AllocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
