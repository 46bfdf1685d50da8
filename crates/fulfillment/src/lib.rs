//! Order fulfillment core for the bookstore backend.
//!
//! This crate turns a checkout request into a persisted order while
//! coordinating payment, address resolution, and inventory reservation,
//! and later transitions orders through dispatch with authorization checks
//! and stock reconciliation:
//! - [`OrderOrchestrator`]: checkout and dispatch workflows with a
//!   compensating cancel on stock failure
//! - [`InventoryLedger`]: reserve/dispatch over the per-product stock
//!   counters, writing the append-only dispatch audit trail
//! - [`AddressResolver`]: delivery address selection with ownership and
//!   fallback rules
//! - [`presenter`]: transport-safe order views and inbound line
//!   translation
//!
//! External collaborators (authentication, payment, catalog) are traits in
//! [`services`], each with an in-memory double for tests.

pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod presenter;
pub mod resolver;
pub mod services;

pub use error::{FulfillmentError, Result};
pub use ledger::InventoryLedger;
pub use orchestrator::{CreateOrderRequest, OrderOrchestrator};
pub use presenter::{OrderLineRequest, OrderView, line_from_request, order_view};
pub use resolver::AddressResolver;
pub use services::auth::{AuthService, Caller, InMemoryAuthService};
pub use services::catalog::{CatalogService, InMemoryCatalog};
pub use services::payment::{InMemoryPaymentGateway, PaymentGateway};
