//! Persistence layer for the bookstore fulfillment core.
//!
//! Defines the four repository traits the orchestration layer depends on
//! (`OrderStore`, `InventoryStore`, `AddressStore`, `DispatchLogStore`)
//! together with an in-memory implementation of each and a PostgreSQL
//! implementation on sqlx.
//!
//! All mutable records carry a [`common::RecordVersion`]; `save` is a
//! compare-and-swap on that version, so a read-check-write sequence against
//! one record is atomic per record and concurrent writers cannot both
//! succeed on stale reads.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod stores;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::{
    InMemoryAddressStore, InMemoryDispatchLogStore, InMemoryInventoryStore, InMemoryOrderStore,
};
pub use postgres::{
    PostgresAddressStore, PostgresDispatchLogStore, PostgresInventoryStore, PostgresOrderStore,
    connect, run_migrations,
};
pub use stores::{AddressStore, DispatchLogStore, InventoryStore, OrderStore};
