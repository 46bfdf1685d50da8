//! In-memory store implementations.
//!
//! These back the unit and orchestration tests and provide the same
//! compare-and-swap semantics as the PostgreSQL implementations: the
//! version check and the write happen under one write lock, so two
//! concurrent savers of the same record cannot both succeed from a stale
//! read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AddressId, OrderId, ProductId, RecordVersion, UserId};
use domain::{DeliveryAddress, DispatchLogEntry, InventoryRecord, Order};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::stores::{AddressStore, DispatchLogStore, InventoryStore, OrderStore};

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<Order> {
        let mut orders = self.orders.write().await;

        let actual = orders
            .get(&order.id())
            .map(|stored| stored.version())
            .unwrap_or(RecordVersion::initial());
        if actual != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                kind: "order",
                id: order.id().to_string(),
                expected: order.version(),
                actual,
            });
        }

        let mut updated = order.clone();
        updated.set_version(order.version().next());
        orders.insert(updated.id(), updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut owned: Vec<_> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|o| o.created_at());
        Ok(owned)
    }
}

/// In-memory inventory store.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    records: Arc<RwLock<HashMap<ProductId, InventoryRecord>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record, bypassing version checks. Test convenience.
    pub async fn seed(&self, record: InventoryRecord) {
        self.records
            .write()
            .await
            .insert(record.product_id().clone(), record);
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn save(&self, record: &InventoryRecord) -> Result<InventoryRecord> {
        let mut records = self.records.write().await;

        let actual = records
            .get(record.product_id())
            .map(|stored| stored.version())
            .unwrap_or(RecordVersion::initial());
        if actual != record.version() {
            return Err(StoreError::ConcurrencyConflict {
                kind: "inventory",
                id: record.product_id().to_string(),
                expected: record.version(),
                actual,
            });
        }

        let mut updated = record.clone();
        updated.set_version(record.version().next());
        records.insert(updated.product_id().clone(), updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        Ok(self.records.read().await.get(product_id).cloned())
    }
}

/// In-memory dispatch log, append-only.
#[derive(Clone, Default)]
pub struct InMemoryDispatchLogStore {
    entries: Arc<RwLock<Vec<DispatchLogEntry>>>,
}

impl InMemoryDispatchLogStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries written.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl DispatchLogStore for InMemoryDispatchLogStore {
    async fn append(&self, entry: &DispatchLogEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn entries_for_order(&self, order_id: OrderId) -> Result<Vec<DispatchLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }
}

/// In-memory address store. Addresses keep insertion order per owner.
#[derive(Clone, Default)]
pub struct InMemoryAddressStore {
    addresses: Arc<RwLock<Vec<DeliveryAddress>>>,
}

impl InMemoryAddressStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressStore for InMemoryAddressStore {
    async fn save(&self, address: &DeliveryAddress) -> Result<()> {
        let mut addresses = self.addresses.write().await;
        if let Some(existing) = addresses.iter_mut().find(|a| a.id == address.id) {
            *existing = address.clone();
        } else {
            addresses.push(address.clone());
        }
        Ok(())
    }

    async fn find_by_id_and_owner(
        &self,
        id: AddressId,
        owner_id: UserId,
    ) -> Result<Option<DeliveryAddress>> {
        let addresses = self.addresses.read().await;
        Ok(addresses
            .iter()
            .find(|a| a.id == id && a.owner_id == owner_id)
            .cloned())
    }

    async fn find_for_user(&self, owner_id: UserId) -> Result<Vec<DeliveryAddress>> {
        let addresses = self.addresses.read().await;
        Ok(addresses
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
