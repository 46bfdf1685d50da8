//! Delivery address record.

use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A saved delivery address, owned by exactly one user.
///
/// Orders store a value copy of the address taken at creation; editing the
/// saved address later never changes an already-placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub id: AddressId,
    pub owner_id: UserId,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl DeliveryAddress {
    /// Creates a new saved address for a user.
    pub fn new(
        owner_id: UserId,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(),
            owner_id,
            street: street.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }
}
