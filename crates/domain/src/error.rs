//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by the order state machine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested transition is not valid from the current status.
    #[error("Cannot {action} an order in {from} status")]
    InvalidTransition {
        from: OrderStatus,
        action: &'static str,
    },

    /// An order with no lines cannot progress past its provisional status.
    #[error("Order has no lines")]
    NoLines,

    /// An order line must reference a positive quantity.
    #[error("Invalid line quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },
}

/// Errors raised by inventory stock transitions.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Not enough warehouse stock to cover the requested reservation.
    #[error(
        "Insufficient stock for {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Not enough on-hold stock to cover the requested dispatch.
    ///
    /// This can only happen when reservation bookkeeping has drifted from
    /// dispatch bookkeeping; it is never a normal user-facing condition.
    #[error(
        "Insufficient on-hold stock for {product_id}: requested {requested}, on hold {on_hold}"
    )]
    InsufficientOnHold {
        product_id: ProductId,
        requested: u32,
        on_hold: u32,
    },
}
