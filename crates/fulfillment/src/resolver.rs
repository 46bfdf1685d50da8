//! Delivery address resolution.

use common::{AddressId, UserId};
use domain::DeliveryAddress;
use store::AddressStore;

/// Picks the delivery address to attach to an order.
///
/// A requested address ID is honored only if it belongs to the given user;
/// otherwise resolution falls back to the first address in the user's
/// saved collection, in stored order. "No address" is an empty result, not
/// an error; the orchestrator decides what that means for checkout.
pub struct AddressResolver<A: AddressStore> {
    addresses: A,
}

impl<A: AddressStore> AddressResolver<A> {
    /// Creates a resolver over the given address store.
    pub fn new(addresses: A) -> Self {
        Self { addresses }
    }

    /// Resolves the delivery address for a checkout.
    pub async fn resolve(
        &self,
        requested: Option<AddressId>,
        user_id: UserId,
    ) -> store::Result<Option<DeliveryAddress>> {
        if let Some(id) = requested
            && let Some(address) = self.addresses.find_by_id_and_owner(id, user_id).await?
        {
            return Ok(Some(address));
        }

        let saved = self.addresses.find_for_user(user_id).await?;
        Ok(saved.into_iter().next())
    }
}
