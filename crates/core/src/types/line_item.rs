//! Cart line items.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId, Quantity};

/// Catalog data for a product about to be added to the cart.
///
/// This is a [`LineItem`] without a quantity: the cart assigns quantities,
/// callers never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    /// Catalog product identifier.
    pub id: ProductId,
    /// Display name.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price as quoted by the catalog.
    pub price: Price,
}

/// One product entry in the cart.
///
/// The field names are the persisted wire format:
/// `{"id", "title", "image_url", "price", "quantity"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog product identifier, unique within a cart.
    pub id: ProductId,
    /// Display name.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price as quoted by the catalog when first added.
    pub price: Price,
    /// Units of this product in the cart.
    pub quantity: Quantity,
}

impl From<NewLineItem> for LineItem {
    fn from(item: NewLineItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            price: item.price,
            quantity: Quantity::ONE,
        }
    }
}
