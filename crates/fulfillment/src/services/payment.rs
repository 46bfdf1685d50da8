//! Payment gateway collaborator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, UserId};

use crate::error::{FulfillmentError, Result};

/// Trait for the payment gateway.
///
/// Only the success/failure contract matters to the fulfillment core: a
/// successful checkout yields an opaque payment reference, a decline maps
/// to [`FulfillmentError::PaymentFailed`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges the user for the order total, returning a payment reference.
    async fn checkout(&self, user_id: UserId, amount: Money) -> Result<String>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (UserId, Money)>,
    next_id: u32,
    fail_on_checkout: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline the next checkout calls.
    pub fn set_fail_on_checkout(&self, fail: bool) {
        self.state.write().unwrap().fail_on_checkout = fail;
    }

    /// Returns the number of successful payments.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }

    /// Returns true if a payment exists with the given reference.
    pub fn has_payment(&self, reference: &str) -> bool {
        self.state.read().unwrap().payments.contains_key(reference)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn checkout(&self, user_id: UserId, amount: Money) -> Result<String> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_checkout {
            return Err(FulfillmentError::PaymentFailed {
                reason: "Payment declined".to_string(),
            });
        }

        state.next_id += 1;
        let reference = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(reference.clone(), (user_id, amount));

        Ok(reference)
    }
}
