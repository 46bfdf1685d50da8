//! Order aggregate: status state machine and order lines.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, RecordVersion, UserId};
use serde::{Deserialize, Serialize};

use crate::address::DeliveryAddress;
use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// PendingPayment ──► Processing ──► PendingReservation ──► Dispatched ──► Shipped ──► Delivered
///       │                │                  │
///       └────────────────┴──────────────────┴──► Cancelled
/// ```
///
/// The fulfillment core drives `PendingPayment → Processing` (full
/// reservation), `Processing → Dispatched` (dispatch), and `Cancelled`
/// from any pre-dispatch status (stock failure during checkout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Draft order persisted at checkout start, payment reference attached.
    #[default]
    PendingPayment,

    /// All lines fully reserved, order is being fulfilled.
    Processing,

    /// Awaiting a back-ordered reservation.
    PendingReservation,

    /// On-hold stock converted to shipped state, audit entries written.
    Dispatched,

    /// Handed to the carrier.
    Shipped,

    /// Delivered to the customer (terminal).
    Delivered,

    /// Order was cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can still be cancelled (any pre-dispatch status).
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::Processing | OrderStatus::PendingReservation
        )
    }

    /// Returns true if the order can be dispatched in this status.
    pub fn can_dispatch(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::PendingReservation => "PENDING_RESERVATION",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from its stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING_PAYMENT" => Some(OrderStatus::PendingPayment),
            "PROCESSING" => Some(OrderStatus::Processing),
            "PENDING_RESERVATION" => Some(OrderStatus::PendingReservation),
            "DISPATCHED" => Some(OrderStatus::Dispatched),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One product/quantity pair within an order.
///
/// Owned exclusively by its order; the dispatch flag and timestamp are set
/// only by the dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product this line references.
    pub product_id: ProductId,

    /// Quantity ordered (> 0).
    pub quantity: u32,

    /// True once the line's on-hold stock has been dispatched.
    pub dispatched: bool,

    /// When the line was dispatched, if it has been.
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl OrderLine {
    /// Creates a new, not-yet-dispatched order line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            dispatched: false,
            dispatched_at: None,
        }
    }
}

/// The persisted order aggregate.
///
/// Created by the orchestrator at checkout start in `PendingPayment` status
/// and mutated only by the orchestrator afterwards. The delivery address is
/// a value copy taken at creation, not a live link to the user's saved
/// address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    user_id: UserId,
    delivery_address: Option<DeliveryAddress>,
    lines: Vec<OrderLine>,
    payment_reference: String,
    #[serde(default)]
    version: RecordVersion,
}

impl Order {
    /// Creates a draft order in `PendingPayment` status.
    pub fn draft(
        user_id: UserId,
        lines: Vec<OrderLine>,
        delivery_address: Option<DeliveryAddress>,
        payment_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            created_at: Utc::now(),
            status: OrderStatus::PendingPayment,
            user_id,
            delivery_address,
            lines,
            payment_reference: payment_reference.into(),
            version: RecordVersion::initial(),
        }
    }

    /// Reconstructs an order from persisted parts.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        created_at: DateTime<Utc>,
        status: OrderStatus,
        user_id: UserId,
        delivery_address: Option<DeliveryAddress>,
        lines: Vec<OrderLine>,
        payment_reference: String,
        version: RecordVersion,
    ) -> Self {
        Self {
            id,
            created_at,
            status,
            user_id,
            delivery_address,
            lines,
            payment_reference,
            version,
        }
    }

    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the delivery address copy attached at creation.
    pub fn delivery_address(&self) -> Option<&DeliveryAddress> {
        self.delivery_address.as_ref()
    }

    /// Returns the order lines in request order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the opaque payment reference.
    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    /// Returns the persisted record version.
    pub fn version(&self) -> RecordVersion {
        self.version
    }

    /// Sets the record version. Called by stores after a successful save.
    pub fn set_version(&mut self, version: RecordVersion) {
        self.version = version;
    }

    /// Returns true if the order has at least one line.
    pub fn has_lines(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Moves the order to `Processing` after all lines were reserved.
    ///
    /// An order with zero lines must never reach `Processing`.
    pub fn mark_processing(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::PendingPayment {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action: "start processing",
            });
        }
        if self.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        self.status = OrderStatus::Processing;
        Ok(())
    }

    /// Moves the order to `Dispatched`.
    pub fn mark_dispatched(&mut self) -> Result<(), OrderError> {
        if !self.status.can_dispatch() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action: "dispatch",
            });
        }
        self.status = OrderStatus::Dispatched;
        Ok(())
    }

    /// Cancels the order. Allowed from any pre-dispatch status.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action: "cancel",
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Flags one line as dispatched at the given time.
    pub fn mark_line_dispatched(&mut self, index: usize, at: DateTime<Utc>) {
        if let Some(line) = self.lines.get_mut(index) {
            line.dispatched = true;
            line.dispatched_at = Some(at);
        }
    }
}
