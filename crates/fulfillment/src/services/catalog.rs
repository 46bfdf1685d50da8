//! Catalog collaborator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProductId;
use domain::Product;

/// Trait for catalog lookups. Catalog CRUD and search live outside the
/// fulfillment core; only existence and lookup matter here.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Returns true if the product exists.
    async fn exists(&self, product_id: &ProductId) -> bool;

    /// Looks a product up by ID.
    async fn find(&self, product_id: &ProductId) -> Option<Product>;
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product to the catalog.
    pub fn add(&self, product: Product) {
        self.products
            .write()
            .unwrap()
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn exists(&self, product_id: &ProductId) -> bool {
        self.products.read().unwrap().contains_key(product_id)
    }

    async fn find(&self, product_id: &ProductId) -> Option<Product> {
        self.products.read().unwrap().get(product_id).cloned()
    }
}
