//! Domain layer for the bookstore fulfillment core.
//!
//! This crate provides the persisted aggregates and the pure domain logic
//! that operates on them:
//! - `Order` with its status state machine and order lines
//! - `InventoryRecord` with the warehouse/on-hold stock split
//! - `DeliveryAddress` and `DispatchLogEntry` records
//! - plain `User` and `Product` records owned by external collaborators
//!
//! No I/O happens here; persistence lives in the `store` crate and
//! orchestration in the `fulfillment` crate.

pub mod address;
pub mod dispatch_log;
pub mod error;
pub mod inventory;
pub mod order;
pub mod product;
pub mod user;

pub use address::DeliveryAddress;
pub use dispatch_log::DispatchLogEntry;
pub use error::{InventoryError, OrderError};
pub use inventory::InventoryRecord;
pub use order::{Order, OrderLine, OrderStatus};
pub use product::Product;
pub use user::User;
