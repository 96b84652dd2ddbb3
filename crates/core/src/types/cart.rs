//! The ordered cart collection and its reducers.
//!
//! Every cart mutation is a pure function from the current collection to the
//! next one. The store applies these under its write lock; nothing here knows
//! about storage or concurrency.

use serde::{Deserialize, Serialize, Serializer};

use super::{LineItem, NewLineItem, ProductId, Quantity};

/// Storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "@GoMarketplace:products";

/// Errors building a [`CartCollection`] from raw line items.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Two lines share the same product ID.
    #[error("duplicate cart line for product {0}")]
    DuplicateId(ProductId),
}

/// What a reducer did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with a quantity of one.
    Added,
    /// An existing line went up to the given quantity.
    Incremented(Quantity),
    /// An existing line went down to the given quantity.
    Decremented(Quantity),
    /// The last unit of a line was taken out, so the line was dropped.
    Removed,
    /// No line matched; the collection is untouched.
    Unchanged,
}

impl CartChange {
    /// Whether the collection differs from before the reducer ran.
    #[must_use]
    pub const fn is_modified(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// The shopper's cart: line items in first-added order, unique by product ID.
///
/// Serializes as a bare JSON array of [`LineItem`]s. Deserializing rejects
/// arrays that repeat a product ID.
///
/// # Example
///
/// ```
/// use marketplace_core::{CartCollection, NewLineItem, Price, ProductId};
///
/// let shirt = NewLineItem {
///     id: ProductId::new("1"),
///     title: "Shirt".into(),
///     image_url: "u".into(),
///     price: Price::default(),
/// };
///
/// let mut cart = CartCollection::new();
/// cart.add(shirt.clone());
/// cart.add(shirt);
///
/// assert_eq!(cart.len(), 1);
/// assert_eq!(cart.total_quantity(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<LineItem>")]
pub struct CartCollection {
    items: Vec<LineItem>,
}

impl CartCollection {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Iterate over line items in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Total units across all lines, for the cart badge.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Add one unit of a product.
    ///
    /// An existing line keeps its position and catalog fields and gains one
    /// unit. Otherwise the product is appended with a quantity of one.
    pub fn add(&mut self, candidate: NewLineItem) -> CartChange {
        match self.line_mut(&candidate.id) {
            Some(line) => {
                line.quantity = line.quantity.incremented();
                CartChange::Incremented(line.quantity)
            }
            None => {
                self.items.push(LineItem::from(candidate));
                CartChange::Added
            }
        }
    }

    /// Add one unit to an existing line. Unknown IDs are ignored.
    pub fn increment(&mut self, id: &ProductId) -> CartChange {
        self.line_mut(id).map_or(CartChange::Unchanged, |line| {
            line.quantity = line.quantity.incremented();
            CartChange::Incremented(line.quantity)
        })
    }

    /// Take one unit off an existing line. Unknown IDs are ignored.
    ///
    /// Taking the last unit removes the line; a line never reaches zero.
    pub fn decrement(&mut self, id: &ProductId) -> CartChange {
        let Some(pos) = self.items.iter().position(|item| &item.id == id) else {
            return CartChange::Unchanged;
        };

        let Some(line) = self.items.get_mut(pos) else {
            return CartChange::Unchanged;
        };

        if let Some(quantity) = line.quantity.decremented() {
            line.quantity = quantity;
            CartChange::Decremented(quantity)
        } else {
            self.items.remove(pos);
            CartChange::Removed
        }
    }

    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored cart.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the value is not a JSON array of line
    /// items, a quantity is not positive, or a product ID repeats.
    pub fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    fn line_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

impl Serialize for CartCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl TryFrom<Vec<LineItem>> for CartCollection {
    type Error = CollectionError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        for (i, item) in items.iter().enumerate() {
            if items.iter().take(i).any(|earlier| earlier.id == item.id) {
                return Err(CollectionError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }
}

impl<'a> IntoIterator for &'a CartCollection {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl From<CartCollection> for Vec<LineItem> {
    fn from(cart: CartCollection) -> Self {
        cart.items
    }
}
