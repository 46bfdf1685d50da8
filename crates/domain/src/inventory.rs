//! Inventory record with the warehouse/on-hold stock split.

use common::{ProductId, RecordVersion};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Per-product stock counters, one record per product.
///
/// `warehouse_stock` counts units available to be newly reserved,
/// `on_hold_stock` counts units reserved for an order but not yet
/// dispatched. Reserving moves units between the two counters 1:1;
/// dispatching only ever decreases `on_hold_stock`. Counters are unsigned,
/// so negative stock is unrepresentable; the guards below fail before any
/// underflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    product_id: ProductId,
    warehouse_stock: u32,
    on_hold_stock: u32,
    min_threshold: u32,
    #[serde(default)]
    version: RecordVersion,
}

impl InventoryRecord {
    /// Creates a new record with all stock in the warehouse.
    pub fn new(product_id: impl Into<ProductId>, warehouse_stock: u32, min_threshold: u32) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_stock,
            on_hold_stock: 0,
            min_threshold,
            version: RecordVersion::initial(),
        }
    }

    /// Reconstructs a record from persisted parts.
    pub fn restore(
        product_id: ProductId,
        warehouse_stock: u32,
        on_hold_stock: u32,
        min_threshold: u32,
        version: RecordVersion,
    ) -> Self {
        Self {
            product_id,
            warehouse_stock,
            on_hold_stock,
            min_threshold,
            version,
        }
    }

    /// Returns the product this record tracks.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the units available to reserve.
    pub fn warehouse_stock(&self) -> u32 {
        self.warehouse_stock
    }

    /// Returns the units reserved but not yet dispatched.
    pub fn on_hold_stock(&self) -> u32 {
        self.on_hold_stock
    }

    /// Returns the reorder threshold (informational only).
    pub fn min_threshold(&self) -> u32 {
        self.min_threshold
    }

    /// Returns the persisted record version.
    pub fn version(&self) -> RecordVersion {
        self.version
    }

    /// Sets the record version. Called by stores after a successful save.
    pub fn set_version(&mut self, version: RecordVersion) {
        self.version = version;
    }

    /// Returns true if warehouse stock has fallen below the reorder threshold.
    pub fn below_threshold(&self) -> bool {
        self.warehouse_stock < self.min_threshold
    }

    /// Moves `quantity` units from warehouse stock to on-hold stock.
    ///
    /// Fails without mutation when warehouse stock cannot cover the
    /// request. Total stock is conserved: the warehouse decrement equals
    /// the on-hold increment.
    pub fn reserve(&mut self, quantity: u32) -> Result<(), InventoryError> {
        if self.warehouse_stock < quantity {
            return Err(InventoryError::InsufficientStock {
                product_id: self.product_id.clone(),
                requested: quantity,
                available: self.warehouse_stock,
            });
        }
        self.warehouse_stock -= quantity;
        self.on_hold_stock += quantity;
        Ok(())
    }

    /// Removes `quantity` dispatched units from on-hold stock.
    ///
    /// Fails without mutation when on-hold stock cannot cover the request;
    /// that can only happen if reservation bookkeeping has drifted from
    /// dispatch bookkeeping.
    pub fn confirm_dispatch(&mut self, quantity: u32) -> Result<(), InventoryError> {
        if self.on_hold_stock < quantity {
            return Err(InventoryError::InsufficientOnHold {
                product_id: self.product_id.clone(),
                requested: quantity,
                on_hold: self.on_hold_stock,
            });
        }
        self.on_hold_stock -= quantity;
        Ok(())
    }

    /// Returns the total units tracked by this record.
    pub fn total_stock(&self) -> u32 {
        self.warehouse_stock + self.on_hold_stock
    }
}
