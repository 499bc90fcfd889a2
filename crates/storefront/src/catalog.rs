//! Product catalog lookup.
//!
//! The cart copies a product's name and price into the line when it is first
//! added, so the catalog only needs point lookups by id.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use corewell_core::ProductId;

/// Errors loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate product id in catalog: {0}")]
    DuplicateId(ProductId),

    #[error("negative price for product {0}")]
    NegativePrice(ProductId),
}

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}

/// Point lookup of products by id.
pub trait Catalog: Send + Sync {
    /// The product with this id, if it exists.
    fn find(&self, id: &ProductId) -> Option<CatalogProduct>;

    /// Every product, in display order.
    fn products(&self) -> Vec<CatalogProduct>;
}

/// A fixed, ordered product list.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: Vec<CatalogProduct>,
}

impl StaticCatalog {
    /// Build a catalog, rejecting duplicate ids and negative prices.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` or `CatalogError::NegativePrice`.
    pub fn new(products: Vec<CatalogProduct>) -> Result<Self, CatalogError> {
        for (i, product) in products.iter().enumerate() {
            if product.price.is_sign_negative() {
                return Err(CatalogError::NegativePrice(product.id.clone()));
            }
            if products.iter().skip(i + 1).any(|p| p.id == product.id) {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
        }
        Ok(Self { products })
    }

    /// The CoreWell range.
    #[must_use]
    pub fn corewell() -> Self {
        let product = |id: &str, name: &str| CatalogProduct {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(5_999, 2),
        };
        Self {
            products: vec![
                product("glow-boost", "Glow Boost"),
                product("colon-cleanse", "Colon Cleanse"),
                product("iron-boost", "Iron Boost"),
            ],
        }
    }

    /// Load a JSON array of `{id, name, price}` objects.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read or is invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::new(serde_json::from_str(&raw)?)
    }
}

impl Catalog for StaticCatalog {
    fn find(&self, id: &ProductId) -> Option<CatalogProduct> {
        self.products.iter().find(|p| &p.id == id).cloned()
    }

    fn products(&self) -> Vec<CatalogProduct> {
        self.products.clone()
    }
}
