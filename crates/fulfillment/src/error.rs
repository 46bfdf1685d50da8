//! Fulfillment error taxonomy.
//!
//! Each variant is a distinct, stable signal so a boundary layer can
//! discriminate "fix your input" from "try again later" from "contact
//! support" without string matching.

use common::{OrderId, ProductId};
use domain::{InventoryError, OrderError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the fulfillment core.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Checkout request carried no lines.
    #[error("Order has no lines")]
    EmptyOrder,

    /// A checkout line references a product the catalog does not know.
    #[error("Invalid product reference: {product_id}")]
    InvalidProductReference { product_id: ProductId },

    /// No resolvable acting user.
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Address resolution exhausted: no requested or saved address.
    #[error("No delivery address available")]
    NoAddressAvailable,

    /// External payment decline. No order was persisted.
    #[error("Payment failed: {reason}")]
    PaymentFailed { reason: String },

    /// Reservation failed after a draft order existed; the order was
    /// cancelled as a compensating action before this propagated.
    #[error(
        "Insufficient stock for {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Data integrity failure: the product has no inventory record.
    #[error("No inventory record for product: {product_id}")]
    InventoryNotFound { product_id: ProductId },

    /// Dispatch-time inconsistency: reservation bookkeeping drifted from
    /// dispatch bookkeeping. Warrants investigation, never a retry path.
    #[error(
        "Insufficient on-hold stock for {product_id}: requested {requested}, on hold {on_hold}"
    )]
    InsufficientOnHoldStock {
        product_id: ProductId,
        requested: u32,
        on_hold: u32,
    },

    /// Dispatch attempted by neither the owner nor an administrator.
    #[error("Caller is neither the order owner nor an administrator")]
    Unauthorized,

    /// Dispatch attempted on an order not in `Processing` status.
    #[error("Order is in {status} status, expected PROCESSING")]
    InvalidOrderState { status: OrderStatus },

    /// Lookup on a nonexistent order ID.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// Inbound line translation references a product the catalog cannot find.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// Order state machine error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<InventoryError> for FulfillmentError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            InventoryError::InsufficientOnHold {
                product_id,
                requested,
                on_hold,
            } => FulfillmentError::InsufficientOnHoldStock {
                product_id,
                requested,
                on_hold,
            },
        }
    }
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
