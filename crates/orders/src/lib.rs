//! Customer orders domain module.
//!
//! Orders, their line items and the allocation ledger entries that link line
//! items to SKUs. Status derivation lives in [`status`] as pure functions; the
//! models only expose transitions that keep stored status consistent with
//! allocated quantities.

pub mod allocation;
pub mod order;
pub mod status;

pub use allocation::Allocation;
pub use order::{LineItem, Order, OrderPriority};
pub use status::{LineItemStatus, OrderStatus, derive_line_item_status, derive_order_status};
