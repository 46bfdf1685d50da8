//! Transport-safe order views and inbound line translation.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId, UserId};
use domain::{DeliveryAddress, Order, OrderLine, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::error::{FulfillmentError, Result};
use crate::services::catalog::CatalogService;

/// One line of an inbound checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderLineRequest {
    /// The product the line references.
    pub product_id: ProductId,

    /// Quantity requested.
    pub quantity: u32,
}

/// Read-only view of an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub quantity: u32,
    pub dispatched: bool,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Read-only view of a delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressView {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Read-only view of an order, safe to hand across a transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub user_id: UserId,
    pub delivery_address: Option<AddressView>,
    pub lines: Vec<OrderLineView>,
    pub payment_reference: String,
}

fn address_view(address: &DeliveryAddress) -> AddressView {
    AddressView {
        id: address.id,
        street: address.street.clone(),
        city: address.city.clone(),
        postal_code: address.postal_code.clone(),
        country: address.country.clone(),
    }
}

/// Projects an order into its transport view. Pure: no stores, no clock.
pub fn order_view(order: &Order) -> OrderView {
    OrderView {
        id: order.id(),
        created_at: order.created_at(),
        status: order.status(),
        user_id: order.user_id(),
        delivery_address: order.delivery_address().map(address_view),
        lines: order
            .lines()
            .iter()
            .map(|line| OrderLineView {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                dispatched: line.dispatched,
                dispatched_at: line.dispatched_at,
            })
            .collect(),
        payment_reference: order.payment_reference().to_string(),
    }
}

/// Translates an inbound request line into a domain order line, verifying
/// the quantity and the product against the catalog.
pub async fn line_from_request<C: CatalogService>(
    catalog: &C,
    request: &OrderLineRequest,
) -> Result<OrderLine> {
    if request.quantity == 0 {
        return Err(domain::OrderError::InvalidQuantity {
            quantity: request.quantity,
        }
        .into());
    }

    let product =
        catalog
            .find(&request.product_id)
            .await
            .ok_or_else(|| FulfillmentError::ProductNotFound {
                product_id: request.product_id.clone(),
            })?;

    Ok(OrderLine::new(product.id, request.quantity))
}
