//! Order and line-item status lifecycles and their derivation rules.

use serde::{Deserialize, Serialize};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Allocated,
    PartiallyAllocated,
    NotAllocated,
    Cancelled,
    ReadyForDelivery,
}

/// Line item status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Pending,
    Allocated,
    PartiallyAllocated,
    NotAllocated,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Allocated => "allocated",
            OrderStatus::PartiallyAllocated => "partially_allocated",
            OrderStatus::NotAllocated => "not_allocated",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::ReadyForDelivery => "ready_for_delivery",
        }
    }

    /// Orders picked up by a released-orders pass.
    pub fn is_releasable(self) -> bool {
        matches!(self, OrderStatus::Received | OrderStatus::NotAllocated)
    }

    /// Statuses that count as a fully satisfied allocation.
    pub fn is_fulfilled(self) -> bool {
        matches!(self, OrderStatus::ReadyForDelivery | OrderStatus::Allocated)
    }
}

impl LineItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineItemStatus::Pending => "pending",
            LineItemStatus::Allocated => "allocated",
            LineItemStatus::PartiallyAllocated => "partially_allocated",
            LineItemStatus::NotAllocated => "not_allocated",
            LineItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn holds_stock(self) -> bool {
        matches!(
            self,
            LineItemStatus::Allocated | LineItemStatus::PartiallyAllocated
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item status from its requested/allocated quantities.
pub fn derive_line_item_status(requested: i64, allocated: i64) -> LineItemStatus {
    if allocated == requested {
        LineItemStatus::Allocated
    } else if allocated > 0 {
        LineItemStatus::PartiallyAllocated
    } else {
        LineItemStatus::NotAllocated
    }
}

/// Order status from its line items' statuses.
///
/// Cancelled line items are ignored. When every line item is cancelled the
/// order is cancelled. An order without any line item has nothing left to
/// allocate and is ready for delivery.
pub fn derive_order_status<I>(line_statuses: I) -> OrderStatus
where
    I: IntoIterator<Item = LineItemStatus>,
{
    let mut seen_any = false;
    let mut active = 0usize;
    let mut all_allocated = true;
    let mut any_stock = false;

    for status in line_statuses {
        seen_any = true;
        if status == LineItemStatus::Cancelled {
            continue;
        }
        active += 1;
        all_allocated &= status == LineItemStatus::Allocated;
        any_stock |= status.holds_stock();
    }

    if active == 0 {
        return if seen_any {
            OrderStatus::Cancelled
        } else {
            OrderStatus::ReadyForDelivery
        };
    }

    if all_allocated {
        OrderStatus::ReadyForDelivery
    } else if any_stock {
        OrderStatus::PartiallyAllocated
    } else {
        OrderStatus::NotAllocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use LineItemStatus as L;

    #[test]
    fn line_item_status_follows_quantities() {
        assert_eq!(derive_line_item_status(10, 10), L::Allocated);
        assert_eq!(derive_line_item_status(10, 4), L::PartiallyAllocated);
        assert_eq!(derive_line_item_status(10, 0), L::NotAllocated);
        assert_eq!(derive_line_item_status(0, 0), L::Allocated);
    }

    #[test]
    fn order_status_rules() {
        assert_eq!(
            derive_order_status([L::Allocated, L::Allocated]),
            OrderStatus::ReadyForDelivery
        );
        assert_eq!(
            derive_order_status([L::Allocated, L::NotAllocated]),
            OrderStatus::PartiallyAllocated
        );
        assert_eq!(
            derive_order_status([L::PartiallyAllocated]),
            OrderStatus::PartiallyAllocated
        );
        assert_eq!(
            derive_order_status([L::NotAllocated, L::Pending]),
            OrderStatus::NotAllocated
        );
    }

    #[test]
    fn cancelled_lines_are_ignored_until_none_remain() {
        assert_eq!(
            derive_order_status([L::Cancelled, L::Allocated]),
            OrderStatus::ReadyForDelivery
        );
        assert_eq!(
            derive_order_status([L::Cancelled, L::Cancelled]),
            OrderStatus::Cancelled
        );
        assert_eq!(
            derive_order_status(Vec::<LineItemStatus>::new()),
            OrderStatus::ReadyForDelivery
        );
    }

    #[test]
    fn fulfilled_and_releasable_sets() {
        assert!(OrderStatus::ReadyForDelivery.is_fulfilled());
        assert!(OrderStatus::Allocated.is_fulfilled());
        assert!(!OrderStatus::PartiallyAllocated.is_fulfilled());
        assert!(OrderStatus::Received.is_releasable());
        assert!(OrderStatus::NotAllocated.is_releasable());
        assert!(!OrderStatus::Cancelled.is_releasable());
    }

    fn any_line_status() -> impl Strategy<Value = LineItemStatus> {
        prop_oneof![
            Just(L::Pending),
            Just(L::Allocated),
            Just(L::PartiallyAllocated),
            Just(L::NotAllocated),
            Just(L::Cancelled),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the order is ready for delivery exactly when it has no
        /// lines at all, or has active lines and every one of them is allocated.
        #[test]
        fn ready_iff_every_active_line_allocated(
            statuses in prop::collection::vec(any_line_status(), 0..8)
        ) {
            let active: Vec<_> = statuses.iter().copied().filter(|s| *s != L::Cancelled).collect();
            let expected_ready = statuses.is_empty()
                || (!active.is_empty() && active.iter().all(|s| *s == L::Allocated));
            let derived = derive_order_status(statuses.clone());
            prop_assert_eq!(derived == OrderStatus::ReadyForDelivery, expected_ready);
            prop_assert!(derived != OrderStatus::Received);
        }

        /// Property: derived line status never claims stock that is not there.
        #[test]
        fn line_status_matches_quantities(requested in 0i64..1000, allocated in 0i64..1000) {
            prop_assume!(allocated <= requested);
            let status = derive_line_item_status(requested, allocated);
            prop_assert_eq!(status == L::Allocated, allocated == requested);
            prop_assert_eq!(status == L::NotAllocated, allocated == 0 && requested > 0);
        }
    }
}
