//! Outcome values returned by the allocation services.

use serde::Serialize;

use wms_core::{DomainError, FailureKind, LineItemId, OrderId, SkuId};
use wms_orders::{Allocation, OrderStatus};

/// Result of allocating one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationOutcome {
    pub order_id: OrderId,
    /// `true` only when the order ended fully allocated.
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub status: OrderStatus,
    /// Allocation records created by this call.
    pub allocations: Vec<Allocation>,
}

impl AllocationOutcome {
    pub(crate) fn fulfilled(order_id: OrderId, status: OrderStatus, allocations: Vec<Allocation>) -> Self {
        Self {
            message: format!("Order {order_id} fully allocated"),
            order_id,
            success: true,
            failure: None,
            status,
            allocations,
        }
    }

    pub(crate) fn unfulfilled(
        order_id: OrderId,
        status: OrderStatus,
        error: DomainError,
        allocations: Vec<Allocation>,
    ) -> Self {
        Self {
            order_id,
            success: false,
            message: error.to_string(),
            failure: Some(error.kind()),
            status,
            allocations,
        }
    }

    /// Units committed by this call.
    pub fn allocated_quantity(&self) -> i64 {
        self.allocations.iter().map(Allocation::quantity).sum()
    }
}

/// Result of cancelling an order or one of its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationOutcome {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_id: Option<LineItemId>,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub released_allocations: usize,
    pub released_quantity: i64,
    /// Order status after the cancellation, when the order exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
}

impl CancellationOutcome {
    pub(crate) fn failed(order_id: OrderId, line_item_id: Option<LineItemId>, error: DomainError) -> Self {
        Self {
            order_id,
            line_item_id,
            success: false,
            message: error.to_string(),
            failure: Some(error.kind()),
            released_allocations: 0,
            released_quantity: 0,
            order_status: None,
        }
    }
}

/// Result of correcting a SKU's total quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    pub sku_id: SkuId,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_total: Option<i64>,
    pub new_total: i64,
    /// Orders whose lines were rewound because the SKU shrank below its
    /// commitments.
    pub affected_orders: Vec<OrderId>,
    /// Re-allocation results for `affected_orders`, in the same order.
    pub reallocations: Vec<AllocationOutcome>,
}

impl CorrectionOutcome {
    pub(crate) fn failed(sku_id: SkuId, new_total: i64, error: DomainError) -> Self {
        Self {
            sku_id,
            success: false,
            message: error.to_string(),
            failure: Some(error.kind()),
            previous_total: None,
            new_total,
            affected_orders: Vec::new(),
            reallocations: Vec::new(),
        }
    }
}
