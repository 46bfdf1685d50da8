//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{ProductId, RecordVersion, UserId};
use domain::{DeliveryAddress, DispatchLogEntry, InventoryRecord, Order, OrderLine, OrderStatus};
use sqlx::PgPool;
use store::{
    AddressStore, DispatchLogStore, InventoryStore, OrderStore, PostgresAddressStore,
    PostgresDispatchLogStore, PostgresInventoryStore, PostgresOrderStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for schema setup
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_fulfillment_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders, inventory, dispatch_log, addresses")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

#[tokio::test]
async fn order_roundtrip_with_lines_and_address() {
    let pool = get_test_pool().await;
    let orders = PostgresOrderStore::new(pool);

    let user = UserId::new();
    let address = DeliveryAddress::new(user, "1 Main St", "Springfield", "12345", "US");
    let order = Order::draft(
        user,
        vec![
            OrderLine::new("978-0134685991", 2),
            OrderLine::new("978-1593278281", 1),
        ],
        Some(address.clone()),
        "PAY-0001",
    );

    let saved = orders.save(&order).await.unwrap();
    assert_eq!(saved.version(), RecordVersion::new(1));

    let loaded = orders.find_by_id(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.id(), order.id());
    assert_eq!(loaded.status(), OrderStatus::PendingPayment);
    assert_eq!(loaded.lines(), order.lines());
    assert_eq!(loaded.delivery_address(), Some(&address));
    assert_eq!(loaded.payment_reference(), "PAY-0001");
}

#[tokio::test]
async fn order_status_update_persists_and_bumps_version() {
    let pool = get_test_pool().await;
    let orders = PostgresOrderStore::new(pool);

    let order = Order::draft(
        UserId::new(),
        vec![OrderLine::new("978-0134685991", 1)],
        None,
        "PAY-0001",
    );
    let mut saved = orders.save(&order).await.unwrap();

    saved.mark_processing().unwrap();
    let finalized = orders.save(&saved).await.unwrap();
    assert_eq!(finalized.version(), RecordVersion::new(2));

    let loaded = orders.find_by_id(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.status(), OrderStatus::Processing);
}

#[tokio::test]
async fn order_stale_save_conflicts() {
    let pool = get_test_pool().await;
    let orders = PostgresOrderStore::new(pool);

    let order = Order::draft(UserId::new(), vec![], None, "PAY-0001");
    let saved = orders.save(&order).await.unwrap();
    orders.save(&saved).await.unwrap();

    let result = orders.save(&saved).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { kind: "order", .. })
    ));
}

#[tokio::test]
async fn find_by_user_returns_owned_orders_oldest_first() {
    let pool = get_test_pool().await;
    let orders = PostgresOrderStore::new(pool);

    let user = UserId::new();
    let first = orders
        .save(&Order::draft(user, vec![], None, "PAY-0001"))
        .await
        .unwrap();
    orders
        .save(&Order::draft(UserId::new(), vec![], None, "PAY-0002"))
        .await
        .unwrap();
    let second = orders
        .save(&Order::draft(user, vec![], None, "PAY-0003"))
        .await
        .unwrap();

    let owned = orders.find_by_user(user).await.unwrap();
    assert_eq!(owned.len(), 2);
    assert_eq!(owned[0].id(), first.id());
    assert_eq!(owned[1].id(), second.id());
}

#[tokio::test]
async fn inventory_roundtrip_and_cas() {
    let pool = get_test_pool().await;
    let inventory = PostgresInventoryStore::new(pool);

    let record = InventoryRecord::new("978-0134685991", 10, 3);
    let saved = inventory.save(&record).await.unwrap();
    assert_eq!(saved.version(), RecordVersion::new(1));

    // Two workers load the same version; only one write lands.
    let mut worker_a = saved.clone();
    let mut worker_b = saved.clone();
    worker_a.reserve(6).unwrap();
    worker_b.reserve(6).unwrap();

    inventory.save(&worker_a).await.unwrap();
    let result = inventory.save(&worker_b).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { kind: "inventory", .. })
    ));

    let stored = inventory
        .find_by_id(&ProductId::new("978-0134685991"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.warehouse_stock(), 4);
    assert_eq!(stored.on_hold_stock(), 6);
}

#[tokio::test]
async fn inventory_missing_product_is_none() {
    let pool = get_test_pool().await;
    let inventory = PostgresInventoryStore::new(pool);

    let found = inventory
        .find_by_id(&ProductId::new("978-MISSING"))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn dispatch_log_appends_and_filters_by_order() {
    let pool = get_test_pool().await;
    let log = PostgresDispatchLogStore::new(pool.clone());
    let orders = PostgresOrderStore::new(pool);

    let order = Order::draft(UserId::new(), vec![], None, "PAY-0001");
    orders.save(&order).await.unwrap();

    let entry = DispatchLogEntry::new(
        ProductId::new("978-0134685991"),
        "Effective Java",
        3,
        order.id(),
        None,
    );
    log.append(&entry).await.unwrap();

    let entries = log.entries_for_order(order.id()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product_title, "Effective Java");
    assert_eq!(entries[0].quantity, 3);

    let other = log.entries_for_order(common::OrderId::new()).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn addresses_keep_stored_order_and_ownership_filter() {
    let pool = get_test_pool().await;
    let addresses = PostgresAddressStore::new(pool);

    let owner = UserId::new();
    let first = DeliveryAddress::new(owner, "1 First St", "Springfield", "11111", "US");
    let second = DeliveryAddress::new(owner, "2 Second St", "Springfield", "22222", "US");
    addresses.save(&first).await.unwrap();
    addresses.save(&second).await.unwrap();

    let stored = addresses.find_for_user(owner).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, first.id);

    let found = addresses
        .find_by_id_and_owner(first.id, owner)
        .await
        .unwrap();
    assert_eq!(found, Some(first.clone()));

    let someone_else = addresses
        .find_by_id_and_owner(first.id, UserId::new())
        .await
        .unwrap();
    assert!(someone_else.is_none());
}
