//! `wms-allocation`: stock allocation services.
//!
//! Three services share one set of [`Stores`](wms_infra::Stores):
//!
//! - [`AllocationEngine`] assigns available SKU stock to order line items.
//! - [`CancellationCoordinator`] releases the stock held by an order or a line item.
//! - [`CorrectionReconciler`] changes a SKU's capacity and, when the new total
//!   no longer covers what is committed, rewinds and re-allocates the affected
//!   orders through an injected [`OrderAllocator`].
//!
//! Business failures come back as outcome values; `Err` is reserved for store
//! failures.

pub mod cancellation;
pub mod correction;
pub mod engine;
pub mod outcome;


pub use cancellation::CancellationCoordinator;
pub use correction::CorrectionReconciler;
pub use engine::{AllocationEngine, OrderAllocator};
pub use outcome::{AllocationOutcome, CancellationOutcome, CorrectionOutcome};
