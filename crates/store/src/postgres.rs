//! PostgreSQL store implementations.
//!
//! Versioned saves compile down to a single guarded statement
//! (`UPDATE ... WHERE id = $1 AND version = $n`), so the version check and
//! the write are one atomic unit per row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId, RecordVersion, UserId};
use domain::{DeliveryAddress, DispatchLogEntry, InventoryRecord, Order, OrderLine, OrderStatus};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::stores::{AddressStore, DispatchLogStore, InventoryStore, OrderStore};

/// Opens a connection pool from the given configuration.
pub async fn connect(config: &StoreConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new order store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let status_text: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_text).ok_or_else(|| StoreError::Corrupt {
            kind: "order",
            id: id.to_string(),
            reason: format!("unknown status '{status_text}'"),
        })?;

        let delivery_address = match row.try_get::<Option<Uuid>, _>("address_id")? {
            Some(address_id) => {
                let owner = row
                    .try_get::<Option<Uuid>, _>("address_owner_id")?
                    .ok_or_else(|| StoreError::Corrupt {
                        kind: "order",
                        id: id.to_string(),
                        reason: "address without owner".to_string(),
                    })?;
                Some(DeliveryAddress {
                    id: AddressId::from_uuid(address_id),
                    owner_id: UserId::from_uuid(owner),
                    street: row
                        .try_get::<Option<String>, _>("address_street")?
                        .unwrap_or_default(),
                    city: row
                        .try_get::<Option<String>, _>("address_city")?
                        .unwrap_or_default(),
                    postal_code: row
                        .try_get::<Option<String>, _>("address_postal_code")?
                        .unwrap_or_default(),
                    country: row
                        .try_get::<Option<String>, _>("address_country")?
                        .unwrap_or_default(),
                })
            }
            None => None,
        };

        Ok(Order::restore(
            id,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            status,
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            delivery_address,
            lines,
            row.try_get("payment_reference")?,
            RecordVersion::new(row.try_get::<i64, _>("version")?),
        ))
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, dispatched, dispatched_at
            FROM order_lines
            WHERE order_id = $1
            ORDER BY line_index ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderLine {
                    product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    dispatched: row.try_get("dispatched")?,
                    dispatched_at: row.try_get("dispatched_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn save(&self, order: &Order) -> Result<Order> {
        let next = order.version().next();
        let mut tx = self.pool.begin().await?;

        if order.version() == RecordVersion::initial() {
            let address = order.delivery_address();
            sqlx::query(
                r#"
                INSERT INTO orders (id, created_at, status, user_id, payment_reference,
                    address_id, address_owner_id, address_street, address_city,
                    address_postal_code, address_country, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(order.created_at())
            .bind(order.status().as_str())
            .bind(order.user_id().as_uuid())
            .bind(order.payment_reference())
            .bind(address.map(|a| a.id.as_uuid()))
            .bind(address.map(|a| a.owner_id.as_uuid()))
            .bind(address.map(|a| a.street.as_str()))
            .bind(address.map(|a| a.city.as_str()))
            .bind(address.map(|a| a.postal_code.as_str()))
            .bind(address.map(|a| a.country.as_str()))
            .bind(next.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::ConcurrencyConflict {
                        kind: "order",
                        id: order.id().to_string(),
                        expected: order.version(),
                        actual: next,
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;
        } else {
            let result =
                sqlx::query("UPDATE orders SET status = $2, version = $3 WHERE id = $1 AND version = $4")
                    .bind(order.id().as_uuid())
                    .bind(order.status().as_str())
                    .bind(next.as_i64())
                    .bind(order.version().as_i64())
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                        .bind(order.id().as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(StoreError::ConcurrencyConflict {
                    kind: "order",
                    id: order.id().to_string(),
                    expected: order.version(),
                    actual: RecordVersion::new(actual.unwrap_or(0)),
                });
            }

            sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
                .bind(order.id().as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        for (index, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_index, product_id, quantity,
                    dispatched, dispatched_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(index as i32)
            .bind(line.product_id.as_str())
            .bind(line.quantity as i32)
            .bind(line.dispatched)
            .bind(line.dispatched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut updated = order.clone();
        updated.set_version(next);
        Ok(updated)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for_order(id).await?;
                Ok(Some(Self::row_to_order(&row, lines)?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at ASC")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let lines = self.lines_for_order(id).await?;
            orders.push(Self::row_to_order(row, lines)?);
        }
        Ok(orders)
    }
}

/// PostgreSQL-backed inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new inventory store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn save(&self, record: &InventoryRecord) -> Result<InventoryRecord> {
        let next = record.version().next();

        if record.version() == RecordVersion::initial() {
            sqlx::query(
                r#"
                INSERT INTO inventory (product_id, warehouse_stock, on_hold_stock,
                    min_threshold, version)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(record.product_id().as_str())
            .bind(record.warehouse_stock() as i32)
            .bind(record.on_hold_stock() as i32)
            .bind(record.min_threshold() as i32)
            .bind(next.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::ConcurrencyConflict {
                        kind: "inventory",
                        id: record.product_id().to_string(),
                        expected: record.version(),
                        actual: next,
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE inventory
                SET warehouse_stock = $2, on_hold_stock = $3, min_threshold = $4, version = $5
                WHERE product_id = $1 AND version = $6
                "#,
            )
            .bind(record.product_id().as_str())
            .bind(record.warehouse_stock() as i32)
            .bind(record.on_hold_stock() as i32)
            .bind(record.min_threshold() as i32)
            .bind(next.as_i64())
            .bind(record.version().as_i64())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM inventory WHERE product_id = $1")
                        .bind(record.product_id().as_str())
                        .fetch_optional(&self.pool)
                        .await?;
                return Err(StoreError::ConcurrencyConflict {
                    kind: "inventory",
                    id: record.product_id().to_string(),
                    expected: record.version(),
                    actual: RecordVersion::new(actual.unwrap_or(0)),
                });
            }
        }

        let mut updated = record.clone();
        updated.set_version(next);
        Ok(updated)
    }

    async fn find_by_id(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query("SELECT * FROM inventory WHERE product_id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(InventoryRecord::restore(
                ProductId::new(row.try_get::<String, _>("product_id")?),
                row.try_get::<i32, _>("warehouse_stock")? as u32,
                row.try_get::<i32, _>("on_hold_stock")? as u32,
                row.try_get::<i32, _>("min_threshold")? as u32,
                RecordVersion::new(row.try_get::<i64, _>("version")?),
            ))
        })
        .transpose()
    }
}

/// PostgreSQL-backed dispatch log store.
#[derive(Clone)]
pub struct PostgresDispatchLogStore {
    pool: PgPool,
}

impl PostgresDispatchLogStore {
    /// Creates a new dispatch log store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &PgRow) -> Result<DispatchLogEntry> {
        Ok(DispatchLogEntry {
            id: row.try_get("id")?,
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            product_title: row.try_get("product_title")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            address_id: row
                .try_get::<Option<Uuid>, _>("address_id")?
                .map(AddressId::from_uuid),
            dispatched_at: row.try_get("dispatched_at")?,
        })
    }
}

#[async_trait]
impl DispatchLogStore for PostgresDispatchLogStore {
    async fn append(&self, entry: &DispatchLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dispatch_log (id, product_id, product_title, quantity, order_id,
                address_id, dispatched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.product_id.as_str())
        .bind(&entry.product_title)
        .bind(entry.quantity as i32)
        .bind(entry.order_id.as_uuid())
        .bind(entry.address_id.map(|a| a.as_uuid()))
        .bind(entry.dispatched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entries_for_order(&self, order_id: OrderId) -> Result<Vec<DispatchLogEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM dispatch_log WHERE order_id = $1 ORDER BY dispatched_at ASC",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }
}

/// PostgreSQL-backed address store.
#[derive(Clone)]
pub struct PostgresAddressStore {
    pool: PgPool,
}

impl PostgresAddressStore {
    /// Creates a new address store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_address(row: &PgRow) -> Result<DeliveryAddress> {
        Ok(DeliveryAddress {
            id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
            country: row.try_get("country")?,
        })
    }
}

#[async_trait]
impl AddressStore for PostgresAddressStore {
    async fn save(&self, address: &DeliveryAddress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, owner_id, street, city, postal_code, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET street = EXCLUDED.street, city = EXCLUDED.city,
                postal_code = EXCLUDED.postal_code, country = EXCLUDED.country
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.owner_id.as_uuid())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.country)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id_and_owner(
        &self,
        id: AddressId,
        owner_id: UserId,
    ) -> Result<Option<DeliveryAddress>> {
        let row = sqlx::query("SELECT * FROM addresses WHERE id = $1 AND owner_id = $2")
            .bind(id.as_uuid())
            .bind(owner_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_address).transpose()
    }

    async fn find_for_user(&self, owner_id: UserId) -> Result<Vec<DeliveryAddress>> {
        let rows =
            sqlx::query("SELECT * FROM addresses WHERE owner_id = $1 ORDER BY created_at ASC")
                .bind(owner_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(Self::row_to_address).collect()
    }
}
