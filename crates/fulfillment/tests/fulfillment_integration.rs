//! End-to-end fulfillment workflows over in-memory stores and collaborators.

use common::{Money, OrderId, ProductId, UserId};
use domain::{DeliveryAddress, InventoryRecord, OrderStatus, Product, User};
use fulfillment::{
    Caller, CreateOrderRequest, FulfillmentError, InMemoryAuthService, InMemoryCatalog,
    InMemoryPaymentGateway, OrderLineRequest, OrderOrchestrator, order_view,
};
use store::{
    AddressStore, DispatchLogStore, InMemoryAddressStore, InMemoryDispatchLogStore,
    InMemoryInventoryStore, InMemoryOrderStore, InventoryStore, OrderStore,
};

struct Harness {
    orchestrator: OrderOrchestrator<
        InMemoryOrderStore,
        InMemoryInventoryStore,
        InMemoryDispatchLogStore,
        InMemoryAddressStore,
        InMemoryCatalog,
        InMemoryPaymentGateway,
    >,
    orders: InMemoryOrderStore,
    inventory: InMemoryInventoryStore,
    dispatch_log: InMemoryDispatchLogStore,
    addresses: InMemoryAddressStore,
    catalog: InMemoryCatalog,
    payment: InMemoryPaymentGateway,
    auth: InMemoryAuthService,
}

impl Harness {
    fn new() -> Self {
        let orders = InMemoryOrderStore::new();
        let inventory = InMemoryInventoryStore::new();
        let dispatch_log = InMemoryDispatchLogStore::new();
        let addresses = InMemoryAddressStore::new();
        let catalog = InMemoryCatalog::new();
        let payment = InMemoryPaymentGateway::new();

        Self {
            orchestrator: OrderOrchestrator::new(
                orders.clone(),
                inventory.clone(),
                dispatch_log.clone(),
                addresses.clone(),
                catalog.clone(),
                payment.clone(),
            ),
            orders,
            inventory,
            dispatch_log,
            addresses,
            catalog,
            payment,
            auth: InMemoryAuthService::new(),
        }
    }

    async fn signed_in_user(&self, email: &str) -> (User, Caller) {
        let user = User::new(email, email.split('@').next().unwrap_or(email));
        self.auth.sign_in(user.clone());
        let caller = Caller::resolve(&self.auth).await;
        self.auth.sign_out();
        (user, caller)
    }

    async fn stock_product(&self, id: &str, title: &str, price_cents: i64, stock: u32) {
        self.catalog
            .add(Product::new(id, title, Money::from_cents(price_cents)));
        self.inventory
            .seed(InventoryRecord::new(id, stock, 2))
            .await;
    }

    async fn saved_address(&self, owner: UserId) -> DeliveryAddress {
        let address = DeliveryAddress::new(owner, "1 First St", "Springfield", "11111", "US");
        self.addresses.save(&address).await.unwrap();
        address
    }

    async fn on_hold(&self, id: &str) -> u32 {
        self.inventory
            .find_by_id(&ProductId::new(id))
            .await
            .unwrap()
            .unwrap()
            .on_hold_stock()
    }

    async fn warehouse(&self, id: &str) -> u32 {
        self.inventory
            .find_by_id(&ProductId::new(id))
            .await
            .unwrap()
            .unwrap()
            .warehouse_stock()
    }
}

fn line(product_id: &str, quantity: u32) -> OrderLineRequest {
    OrderLineRequest {
        product_id: ProductId::new(product_id),
        quantity,
    }
}

fn request(lines: Vec<OrderLineRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        lines,
        delivery_address_id: None,
    }
}

#[tokio::test]
async fn checkout_reserves_stock_and_lands_in_processing() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;
    h.stock_product("978-1593278281", "The Rust Programming Language", 3995, 5)
        .await;
    let address = h.saved_address(user.id).await;

    let order = h
        .orchestrator
        .create_order(
            &caller,
            request(vec![line("978-0134685991", 2), line("978-1593278281", 1)]),
        )
        .await
        .unwrap();

    assert_eq!(order.status(), OrderStatus::Processing);
    assert_eq!(order.user_id(), user.id);
    assert_eq!(order.payment_reference(), "PAY-0001");
    assert_eq!(order.lines().len(), 2);
    assert_eq!(order.delivery_address().map(|a| a.id), Some(address.id));
    // Draft save plus finalizing save, nothing in between.
    assert_eq!(order.version().as_i64(), 2);

    assert_eq!(h.warehouse("978-0134685991").await, 8);
    assert_eq!(h.on_hold("978-0134685991").await, 2);
    assert_eq!(h.warehouse("978-1593278281").await, 4);
    assert_eq!(h.on_hold("978-1593278281").await, 1);

    // Payment was charged for the full total, once.
    assert_eq!(h.payment.payment_count(), 1);
    assert!(h.payment.has_payment("PAY-0001"));
    assert_eq!(h.dispatch_log.entry_count().await, 0);
}

#[tokio::test]
async fn checkout_with_explicit_address_uses_it() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;
    h.saved_address(user.id).await;
    let second = DeliveryAddress::new(user.id, "2 Second St", "Springfield", "22222", "US");
    h.addresses.save(&second).await.unwrap();

    let order = h
        .orchestrator
        .create_order(
            &caller,
            CreateOrderRequest {
                lines: vec![line("978-0134685991", 1)],
                delivery_address_id: Some(second.id),
            },
        )
        .await
        .unwrap();

    assert_eq!(order.delivery_address().map(|a| a.id), Some(second.id));
}

#[tokio::test]
async fn empty_checkout_is_rejected_before_any_side_effect() {
    let h = Harness::new();
    let (_, caller) = h.signed_in_user("reader@example.com").await;

    let result = h.orchestrator.create_order(&caller, request(vec![])).await;

    assert!(matches!(result, Err(FulfillmentError::EmptyOrder)));
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn unknown_product_reference_is_rejected_before_payment() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.saved_address(user.id).await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-MISSING", 1)]))
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InvalidProductReference { .. })
    ));
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn zero_quantity_line_is_rejected() {
    let h = Harness::new();
    let (_, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0134685991", 0)]))
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::Order(
            domain::OrderError::InvalidQuantity { quantity: 0 }
        ))
    ));
    assert_eq!(h.payment.payment_count(), 0);
}

#[tokio::test]
async fn anonymous_checkout_is_rejected() {
    let h = Harness::new();
    let caller = Caller::resolve(&h.auth).await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0134685991", 1)]))
        .await;

    assert!(matches!(result, Err(FulfillmentError::NotAuthenticated)));
}

#[tokio::test]
async fn checkout_without_any_address_charges_nothing() {
    let h = Harness::new();
    let (_, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0134685991", 1)]))
        .await;

    assert!(matches!(result, Err(FulfillmentError::NoAddressAvailable)));
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.orders.order_count().await, 0);
}

#[tokio::test]
async fn declined_payment_persists_nothing() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;
    h.saved_address(user.id).await;
    h.payment.set_fail_on_checkout(true);

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0134685991", 1)]))
        .await;

    assert!(matches!(result, Err(FulfillmentError::PaymentFailed { .. })));
    assert_eq!(h.orders.order_count().await, 0);
    assert_eq!(h.on_hold("978-0134685991").await, 0);
    assert_eq!(h.warehouse("978-0134685991").await, 10);
}

#[tokio::test]
async fn partial_reservation_cancels_order_and_keeps_earlier_holds() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;
    h.stock_product("978-1593278281", "The Rust Programming Language", 3995, 1)
        .await;
    h.saved_address(user.id).await;

    let result = h
        .orchestrator
        .create_order(
            &caller,
            request(vec![line("978-0134685991", 2), line("978-1593278281", 3)]),
        )
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock {
            requested: 3,
            available: 1,
            ..
        })
    ));

    // The order exists but was cancelled as compensation.
    let stored = h
        .orders
        .find_by_user(user.id)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
    assert_eq!(stored.version().as_i64(), 2);

    // The first line's hold stays applied; the second never moved.
    assert_eq!(h.on_hold("978-0134685991").await, 2);
    assert_eq!(h.warehouse("978-1593278281").await, 1);
    assert_eq!(h.on_hold("978-1593278281").await, 0);

    // Payment is not reversed here.
    assert_eq!(h.payment.payment_count(), 1);
}

#[tokio::test]
async fn missing_inventory_record_cancels_order() {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    // In the catalog but never stocked.
    h.catalog.add(Product::new(
        "978-0134685991",
        "Effective Java",
        Money::from_cents(4500),
    ));
    h.saved_address(user.id).await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0134685991", 1)]))
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InventoryNotFound { .. })
    ));
    let stored = h
        .orders
        .find_by_user(user.id)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
}

async fn processing_order(h: &Harness, caller: &Caller) -> OrderId {
    h.orchestrator
        .create_order(
            caller,
            request(vec![line("978-0134685991", 3), line("978-1593278281", 1)]),
        )
        .await
        .unwrap()
        .id()
}

async fn stocked_harness() -> (Harness, User, Caller) {
    let h = Harness::new();
    let (user, caller) = h.signed_in_user("reader@example.com").await;
    h.stock_product("978-0134685991", "Effective Java", 4500, 10)
        .await;
    h.stock_product("978-1593278281", "The Rust Programming Language", 3995, 5)
        .await;
    h.saved_address(user.id).await;
    (h, user, caller)
}

#[tokio::test]
async fn owner_dispatch_moves_stock_and_writes_audit_trail() {
    let (h, _, caller) = stocked_harness().await;
    let order_id = processing_order(&h, &caller).await;

    let order = h.orchestrator.dispatch_order(&caller, order_id).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Dispatched);
    assert!(order.lines().iter().all(|l| l.dispatched));
    assert!(order.lines().iter().all(|l| l.dispatched_at.is_some()));

    // On-hold converted, warehouse untouched.
    assert_eq!(h.on_hold("978-0134685991").await, 0);
    assert_eq!(h.warehouse("978-0134685991").await, 7);
    assert_eq!(h.on_hold("978-1593278281").await, 0);
    assert_eq!(h.warehouse("978-1593278281").await, 4);

    let entries = h.dispatch_log.entries_for_order(order_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].product_title, "Effective Java");
    assert_eq!(entries[0].quantity, 3);
    assert_eq!(
        entries[0].address_id,
        order.delivery_address().map(|a| a.id)
    );

    // The stored copy matches what came back.
    let stored = h.orders.find_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(order_view(&stored), order_view(&order));
}

#[tokio::test]
async fn stranger_dispatch_is_refused_with_no_side_effects() {
    let (h, _, owner) = stocked_harness().await;
    let order_id = processing_order(&h, &owner).await;
    let (_, stranger) = h.signed_in_user("other@example.com").await;

    let result = h.orchestrator.dispatch_order(&stranger, order_id).await;

    assert!(matches!(result, Err(FulfillmentError::Unauthorized)));
    let stored = h.orders.find_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Processing);
    assert_eq!(h.on_hold("978-0134685991").await, 3);
    assert_eq!(h.dispatch_log.entry_count().await, 0);
}

#[tokio::test]
async fn anonymous_dispatch_is_refused() {
    let (h, _, owner) = stocked_harness().await;
    let order_id = processing_order(&h, &owner).await;

    let anonymous = Caller::anonymous();
    let result = h.orchestrator.dispatch_order(&anonymous, order_id).await;
    assert!(matches!(result, Err(FulfillmentError::NotAuthenticated)));
}

#[tokio::test]
async fn administrator_dispatches_someone_elses_order() {
    let (h, _, owner) = stocked_harness().await;
    let order_id = processing_order(&h, &owner).await;

    h.auth.sign_in(User::new("ops@example.com", "ops"));
    h.auth.set_administrator(true);
    let admin = Caller::resolve(&h.auth).await;

    let order = h.orchestrator.dispatch_order(&admin, order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Dispatched);
}

#[tokio::test]
async fn second_dispatch_fails_and_moves_no_stock() {
    let (h, _, caller) = stocked_harness().await;
    let order_id = processing_order(&h, &caller).await;

    h.orchestrator.dispatch_order(&caller, order_id).await.unwrap();
    let result = h.orchestrator.dispatch_order(&caller, order_id).await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InvalidOrderState {
            status: OrderStatus::Dispatched
        })
    ));
    // No duplicate audit entries, no double decrement.
    let entries = h.dispatch_log.entries_for_order(order_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(h.warehouse("978-0134685991").await, 7);
}

#[tokio::test]
async fn cancelled_order_cannot_be_dispatched() {
    let (h, user, caller) = stocked_harness().await;
    h.stock_product("978-0000000000", "Out of Print", 1000, 0)
        .await;

    let result = h
        .orchestrator
        .create_order(&caller, request(vec![line("978-0000000000", 1)]))
        .await;
    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock { .. })
    ));
    let cancelled = h
        .orders
        .find_by_user(user.id)
        .await
        .unwrap()
        .pop()
        .unwrap();

    let result = h.orchestrator.dispatch_order(&caller, cancelled.id()).await;
    assert!(matches!(
        result,
        Err(FulfillmentError::InvalidOrderState {
            status: OrderStatus::Cancelled
        })
    ));
}

#[tokio::test]
async fn dispatching_unknown_order_fails() {
    let (h, _, caller) = stocked_harness().await;
    let missing = OrderId::new();

    let result = h.orchestrator.dispatch_order(&caller, missing).await;
    assert!(matches!(
        result,
        Err(FulfillmentError::OrderNotFound { order_id }) if order_id == missing
    ));
}

#[tokio::test]
async fn orders_for_user_lists_only_the_callers_orders() {
    let (h, _, first) = stocked_harness().await;
    processing_order(&h, &first).await;
    processing_order(&h, &first).await;

    let (other_user, second) = h.signed_in_user("other@example.com").await;
    h.saved_address(other_user.id).await;
    h.orchestrator
        .create_order(&second, request(vec![line("978-0134685991", 1)]))
        .await
        .unwrap();

    let mine = h.orchestrator.orders_for_user(&first).await.unwrap();
    assert_eq!(mine.len(), 2);
    let theirs = h.orchestrator.orders_for_user(&second).await.unwrap();
    assert_eq!(theirs.len(), 1);

    let anonymous = Caller::anonymous();
    let result = h.orchestrator.orders_for_user(&anonymous).await;
    assert!(matches!(result, Err(FulfillmentError::NotAuthenticated)));
}

#[tokio::test]
async fn find_order_enforces_ownership() {
    let (h, _, owner) = stocked_harness().await;
    let order_id = processing_order(&h, &owner).await;

    let found = h.orchestrator.find_order(&owner, order_id).await.unwrap();
    assert_eq!(found.id(), order_id);

    let (_, stranger) = h.signed_in_user("other@example.com").await;
    let result = h.orchestrator.find_order(&stranger, order_id).await;
    assert!(matches!(result, Err(FulfillmentError::Unauthorized)));
}
