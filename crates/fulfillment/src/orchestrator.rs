//! Checkout and dispatch orchestration.

use chrono::Utc;
use common::{AddressId, Money, OrderId};
use domain::{Order, User};
use serde::Deserialize;
use store::{AddressStore, DispatchLogStore, InventoryStore, OrderStore, StoreError};

use crate::error::{FulfillmentError, Result};
use crate::ledger::InventoryLedger;
use crate::presenter::OrderLineRequest;
use crate::resolver::AddressResolver;
use crate::services::auth::Caller;
use crate::services::catalog::CatalogService;
use crate::services::payment::PaymentGateway;

/// Inbound checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// Requested lines, in the order the customer placed them.
    pub lines: Vec<OrderLineRequest>,

    /// Explicitly chosen delivery address, if any.
    pub delivery_address_id: Option<AddressId>,
}

/// Drives the order lifecycle: checkout into a persisted order, and
/// dispatch of a fully reserved order.
///
/// Checkout validates, charges, persists a draft, then reserves line by
/// line. A reservation failure cancels the order it just created; stock
/// already moved on-hold for earlier lines stays on hold for manual
/// reconciliation. Payment is never reversed here.
pub struct OrderOrchestrator<O, I, D, A: AddressStore, C, P> {
    orders: O,
    ledger: InventoryLedger<I, D, C>,
    resolver: AddressResolver<A>,
    catalog: C,
    payment: P,
}

impl<O, I, D, A, C, P> OrderOrchestrator<O, I, D, A, C, P>
where
    O: OrderStore,
    I: InventoryStore,
    D: DispatchLogStore,
    A: AddressStore,
    C: CatalogService + Clone,
    P: PaymentGateway,
{
    /// Wires the orchestrator from its stores and collaborators.
    pub fn new(orders: O, inventory: I, dispatch_log: D, addresses: A, catalog: C, payment: P) -> Self {
        Self {
            orders,
            ledger: InventoryLedger::new(inventory, dispatch_log, catalog.clone()),
            resolver: AddressResolver::new(addresses),
            catalog,
            payment,
        }
    }

    /// Runs a checkout end to end.
    ///
    /// Nothing is persisted until payment succeeds. After the draft order
    /// exists, a failed reservation cancels it and the stock error
    /// propagates to the caller.
    #[tracing::instrument(skip(self, caller, request), fields(lines = request.lines.len()))]
    pub async fn create_order(&self, caller: &Caller, request: CreateOrderRequest) -> Result<Order> {
        let started = std::time::Instant::now();
        let user = caller
            .current_user()
            .ok_or(FulfillmentError::NotAuthenticated)?;

        if request.lines.is_empty() {
            return Err(FulfillmentError::EmptyOrder);
        }

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut total = Money::zero();
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(domain::OrderError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }
            let product = self.catalog.find(&line.product_id).await.ok_or_else(|| {
                FulfillmentError::InvalidProductReference {
                    product_id: line.product_id.clone(),
                }
            })?;
            total += product.price.multiply(line.quantity);
            lines.push(domain::OrderLine::new(product.id, line.quantity));
        }

        let address = self
            .resolver
            .resolve(request.delivery_address_id, user.id)
            .await?
            .ok_or(FulfillmentError::NoAddressAvailable)?;

        let reference = self.payment.checkout(user.id, total).await?;

        let draft = Order::draft(user.id, lines, Some(address), reference);
        let mut order = self.orders.save(&draft).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id(), total = %total, "draft order persisted");

        for line in order.lines().to_vec() {
            if let Err(e) = self
                .ledger
                .reserve(&line.product_id, line.quantity, order.id())
                .await
            {
                return Err(self.cancel_after_failed_reservation(order, e).await);
            }
        }

        order.mark_processing()?;
        let order = self.orders.save(&order).await?;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), "order fully reserved");
        Ok(order)
    }

    /// Compensates a draft whose reservation failed: the order itself is
    /// cancelled, then the original stock error propagates.
    async fn cancel_after_failed_reservation(
        &self,
        mut order: Order,
        cause: FulfillmentError,
    ) -> FulfillmentError {
        tracing::warn!(order_id = %order.id(), %cause, "reservation failed, cancelling order");
        if let Err(e) = self.cancel_and_save(&mut order).await {
            tracing::error!(order_id = %order.id(), error = %e, "compensating cancel failed");
        } else {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        cause
    }

    async fn cancel_and_save(&self, order: &mut Order) -> Result<()> {
        order.cancel()?;
        self.orders.save(order).await?;
        Ok(())
    }

    /// Dispatches a fully reserved order.
    ///
    /// Only the order's owner or an administrator may dispatch. The order
    /// is claimed (moved to `Dispatched`) before any stock moves, so a
    /// concurrent second dispatch loses the claim and performs no side
    /// effects.
    #[tracing::instrument(skip(self, caller))]
    pub async fn dispatch_order(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound { order_id })?;

        self.authorize_dispatch(caller, &order)?;

        if !order.status().can_dispatch() {
            return Err(FulfillmentError::InvalidOrderState {
                status: order.status(),
            });
        }

        order.mark_dispatched()?;
        let mut order = match self.orders.save(&order).await {
            Ok(order) => order,
            // A concurrent dispatch already claimed the order.
            Err(StoreError::ConcurrencyConflict { .. }) => {
                return Err(FulfillmentError::InvalidOrderState {
                    status: domain::OrderStatus::Dispatched,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let address_id = order.delivery_address().map(|a| a.id);
        for (index, line) in order.lines().to_vec().into_iter().enumerate() {
            self.ledger
                .dispatch(&line.product_id, line.quantity, order.id(), address_id)
                .await?;
            order.mark_line_dispatched(index, Utc::now());
        }

        let order = self.orders.save(&order).await?;
        metrics::counter!("orders_dispatched_total").increment(1);
        tracing::info!(order_id = %order.id(), "order dispatched");
        Ok(order)
    }

    fn authorize_dispatch(&self, caller: &Caller, order: &Order) -> Result<()> {
        if caller.is_administrator() {
            return Ok(());
        }
        match caller.current_user() {
            None => Err(FulfillmentError::NotAuthenticated),
            Some(User { id, .. }) if *id == order.user_id() => Ok(()),
            Some(_) => Err(FulfillmentError::Unauthorized),
        }
    }

    /// Lists the caller's own orders, oldest first.
    pub async fn orders_for_user(&self, caller: &Caller) -> Result<Vec<Order>> {
        let user = caller
            .current_user()
            .ok_or(FulfillmentError::NotAuthenticated)?;
        Ok(self.orders.find_by_user(user.id).await?)
    }

    /// Looks an order up for its owner or an administrator.
    pub async fn find_order(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound { order_id })?;
        self.authorize_dispatch(caller, &order)?;
        Ok(order)
    }
}
