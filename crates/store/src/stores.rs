//! Repository traits consumed by the orchestration layer.
//!
//! `save` on versioned records is a compare-and-swap: the record's version
//! must match the stored version (or be the initial version for a record
//! that has never been saved), and the store bumps the version on success.
//! A mismatch fails with [`StoreError::ConcurrencyConflict`] and leaves the
//! stored record untouched.

use async_trait::async_trait;
use common::{AddressId, OrderId, ProductId, UserId};
use domain::{DeliveryAddress, DispatchLogEntry, InventoryRecord, Order};

use crate::error::Result;

/// Store for persisted order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Saves the order, inserting on first save. Returns the stored copy
    /// with its bumped version.
    async fn save(&self, order: &Order) -> Result<Order>;

    /// Loads an order by ID.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads all orders owned by a user, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

/// Store for per-product inventory records.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Saves the record under compare-and-swap versioning. Returns the
    /// stored copy with its bumped version.
    async fn save(&self, record: &InventoryRecord) -> Result<InventoryRecord>;

    /// Loads the inventory record for a product.
    async fn find_by_id(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>>;
}

/// Append-only store for dispatch audit entries.
#[async_trait]
pub trait DispatchLogStore: Send + Sync {
    /// Appends one entry. Entries are never updated or deleted.
    async fn append(&self, entry: &DispatchLogEntry) -> Result<()>;

    /// Returns the entries written for an order, oldest first.
    async fn entries_for_order(&self, order_id: OrderId) -> Result<Vec<DispatchLogEntry>>;
}

/// Store for users' saved delivery addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Saves a new address at the end of the owner's collection.
    async fn save(&self, address: &DeliveryAddress) -> Result<()>;

    /// Loads an address by ID, constrained to the given owner.
    async fn find_by_id_and_owner(
        &self,
        id: AddressId,
        owner_id: UserId,
    ) -> Result<Option<DeliveryAddress>>;

    /// Returns the owner's addresses in stored order.
    async fn find_for_user(&self, owner_id: UserId) -> Result<Vec<DeliveryAddress>>;
}
