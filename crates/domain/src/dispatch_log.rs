//! Append-only dispatch audit entries.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit entry, written whenever on-hold stock is converted to a
/// shipped state.
///
/// Entries denormalize the product title so the trail stays readable even
/// if the catalog changes later. They are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLogEntry {
    pub id: Uuid,
    pub product_id: ProductId,
    pub product_title: String,
    pub quantity: u32,
    pub order_id: OrderId,
    pub address_id: Option<AddressId>,
    pub dispatched_at: DateTime<Utc>,
}

impl DispatchLogEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(
        product_id: ProductId,
        product_title: impl Into<String>,
        quantity: u32,
        order_id: OrderId,
        address_id: Option<AddressId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            product_title: product_title.into(),
            quantity,
            order_id,
            address_id,
            dispatched_at: Utc::now(),
        }
    }
}
