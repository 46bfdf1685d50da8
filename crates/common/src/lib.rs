//! Shared types for the bookstore fulfillment core.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{AddressId, OrderId, ProductId, RecordVersion, UserId};
