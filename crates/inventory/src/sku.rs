use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, Entity, ProductNumber, SkuId};

/// Stock of one product at one warehouse location.
///
/// Invariant: `0 <= available_quantity <= total_quantity`. The difference is
/// the quantity currently committed to allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    id: SkuId,
    product_number: ProductNumber,
    total_quantity: i64,
    available_quantity: i64,
    warehouse_location: String,
    location_locked: bool,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

impl Sku {
    /// Create a fully available SKU.
    pub fn new(
        id: SkuId,
        product_number: ProductNumber,
        total_quantity: i64,
        warehouse_location: impl Into<String>,
    ) -> DomainResult<Self> {
        if total_quantity < 0 {
            return Err(DomainError::invalid_input("quantity cannot be negative"));
        }
        let now = Utc::now();
        Ok(Self {
            id,
            product_number,
            total_quantity,
            available_quantity: total_quantity,
            warehouse_location: warehouse_location.into(),
            location_locked: false,
            created_at: now,
            last_modified_at: now,
        })
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.location_locked = locked;
        self
    }

    pub fn id_typed(&self) -> &SkuId {
        &self.id
    }

    pub fn product_number(&self) -> &ProductNumber {
        &self.product_number
    }

    pub fn total_quantity(&self) -> i64 {
        self.total_quantity
    }

    pub fn available_quantity(&self) -> i64 {
        self.available_quantity
    }

    pub fn warehouse_location(&self) -> &str {
        &self.warehouse_location
    }

    pub fn is_location_locked(&self) -> bool {
        self.location_locked
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    /// Quantity committed to allocations (`total - available`).
    pub fn allocated_quantity(&self) -> i64 {
        self.total_quantity - self.available_quantity
    }

    pub fn can_allocate(&self, quantity: i64) -> bool {
        !self.location_locked && self.available_quantity >= quantity
    }

    /// Commit `quantity` units to an allocation.
    pub fn take(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::invalid_input("allocated quantity must be positive"));
        }
        if self.location_locked {
            return Err(DomainError::invalid_input(format!(
                "SKU {} is location-locked",
                self.id
            )));
        }
        if quantity > self.available_quantity {
            return Err(DomainError::invalid_input(format!(
                "SKU {} has {} available, cannot take {}",
                self.id, self.available_quantity, quantity
            )));
        }
        self.available_quantity -= quantity;
        self.touch();
        Ok(())
    }

    /// Return `quantity` previously taken units to availability.
    ///
    /// Availability never rises above the total; returns the amount actually
    /// restored.
    pub fn release(&mut self, quantity: i64) -> i64 {
        let restored = quantity.max(0).min(self.total_quantity - self.available_quantity);
        self.available_quantity += restored;
        self.touch();
        restored
    }

    /// Set the total while keeping `allocated` units committed.
    ///
    /// Only valid when the new total still covers the commitment.
    pub fn correct_total(&mut self, new_total: i64, allocated: i64) -> DomainResult<()> {
        if new_total < 0 {
            return Err(DomainError::invalid_input("quantity cannot be negative"));
        }
        if allocated < 0 || new_total < allocated {
            return Err(DomainError::shortfall(format!(
                "SKU {}: total {} cannot cover {} allocated units",
                self.id, new_total, allocated
            )));
        }
        self.total_quantity = new_total;
        self.available_quantity = new_total - allocated;
        self.touch();
        Ok(())
    }

    /// Shrink (or grow) the total, removing the shrinkage from availability.
    ///
    /// Used after commitments on this SKU were rewound, when availability has
    /// been restored to the old total.
    pub fn resize_total(&mut self, new_total: i64) -> DomainResult<()> {
        if new_total < 0 {
            return Err(DomainError::invalid_input("quantity cannot be negative"));
        }
        let shrinkage = (self.total_quantity - new_total).max(0);
        self.total_quantity = new_total;
        self.available_quantity = (self.available_quantity - shrinkage).clamp(0, new_total);
        self.touch();
        Ok(())
    }

    /// Validate quantity invariants (e.g. after loading from an external source).
    pub fn check_invariants(&self) -> DomainResult<()> {
        if self.available_quantity < 0 || self.available_quantity > self.total_quantity {
            return Err(DomainError::invalid_input(format!(
                "SKU {}: available {} outside 0..={}",
                self.id, self.available_quantity, self.total_quantity
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.last_modified_at = Utc::now();
    }
}

impl Entity for Sku {
    type Id = SkuId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
