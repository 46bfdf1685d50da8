//! Inventory ledger: reserve and dispatch over the per-product stock split.

use common::{AddressId, OrderId, ProductId};
use domain::{DispatchLogEntry, InventoryRecord};
use store::{DispatchLogStore, InventoryStore, StoreError};

use crate::error::{FulfillmentError, Result};
use crate::services::catalog::CatalogService;

/// Owns all mutation of inventory records.
///
/// Every reserve/dispatch is an atomic read-check-write against one
/// record: the load and the versioned save form a compare-and-swap, and a
/// conflicting writer simply reloads and retries on fresh counters. Two
/// simultaneous reservations can therefore never both succeed when
/// capacity only covers one of them.
pub struct InventoryLedger<I, D, C> {
    inventory: I,
    dispatch_log: D,
    catalog: C,
}

impl<I, D, C> InventoryLedger<I, D, C>
where
    I: InventoryStore,
    D: DispatchLogStore,
    C: CatalogService,
{
    /// Creates a new ledger over the given stores and catalog.
    pub fn new(inventory: I, dispatch_log: D, catalog: C) -> Self {
        Self {
            inventory,
            dispatch_log,
            catalog,
        }
    }

    async fn load(&self, product_id: &ProductId) -> Result<InventoryRecord> {
        self.inventory
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| FulfillmentError::InventoryNotFound {
                product_id: product_id.clone(),
            })
    }

    /// Returns the warehouse stock available to reserve.
    pub async fn available_stock(&self, product_id: &ProductId) -> Result<u32> {
        Ok(self.load(product_id).await?.warehouse_stock())
    }

    /// Moves `quantity` units of a product from warehouse to on-hold stock
    /// for the given order.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<InventoryRecord> {
        loop {
            let mut record = self.load(product_id).await?;
            record.reserve(quantity)?;

            match self.inventory.save(&record).await {
                Ok(updated) => {
                    metrics::counter!("stock_reservations_total").increment(1);
                    tracing::info!(%order_id, quantity, "stock reserved");
                    if updated.below_threshold() {
                        tracing::warn!(
                            warehouse_stock = updated.warehouse_stock(),
                            min_threshold = updated.min_threshold(),
                            "warehouse stock below reorder threshold"
                        );
                    }
                    return Ok(updated);
                }
                // Lost the race; retry on fresh counters.
                Err(StoreError::ConcurrencyConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Converts `quantity` on-hold units of a product to a shipped state,
    /// writing an audit entry before the stock moves.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn dispatch(
        &self,
        product_id: &ProductId,
        quantity: u32,
        order_id: OrderId,
        address_id: Option<AddressId>,
    ) -> Result<InventoryRecord> {
        let record = self.load(product_id).await?;
        if record.on_hold_stock() < quantity {
            tracing::error!(
                %order_id,
                quantity,
                on_hold = record.on_hold_stock(),
                "dispatch exceeds on-hold stock; reservation bookkeeping has drifted"
            );
            return Err(FulfillmentError::InsufficientOnHoldStock {
                product_id: product_id.clone(),
                requested: quantity,
                on_hold: record.on_hold_stock(),
            });
        }

        // The audit entry goes first: a logging failure aborts before any
        // stock is touched. It is written once, outside the retry loop.
        let title = match self.catalog.find(product_id).await {
            Some(product) => product.title,
            None => product_id.to_string(),
        };
        let entry =
            DispatchLogEntry::new(product_id.clone(), title, quantity, order_id, address_id);
        self.dispatch_log.append(&entry).await?;

        loop {
            let mut record = self.load(product_id).await?;
            record.confirm_dispatch(quantity)?;

            match self.inventory.save(&record).await {
                Ok(updated) => {
                    metrics::counter!("dispatches_total").increment(1);
                    tracing::info!(%order_id, quantity, "stock dispatched");
                    return Ok(updated);
                }
                Err(StoreError::ConcurrencyConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
