//! Product record, owned by the catalog collaborator.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product as seen by the fulfillment core.
///
/// Read-only here; catalog CRUD lives outside this workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Money,
}

impl Product {
    /// Creates a new product.
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
        }
    }
}
