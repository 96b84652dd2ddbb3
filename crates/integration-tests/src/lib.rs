//! Integration tests for the marketplace cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_lifecycle` - Load, mutate and reload against file-backed storage
//! - `cart_concurrency` - Ordering of mutations and writes under contention
//!
//! This crate only holds shared fixtures; the tests live in `tests/`.

use marketplace_cart::{CartStore, FileStorage};
use marketplace_core::{CART_STORAGE_KEY, NewLineItem, Price, ProductId};
use tempfile::TempDir;

/// A catalog product as the product list would hand it to the cart.
#[must_use]
pub fn product(id: &str, title: &str, price: i64) -> NewLineItem {
    NewLineItem {
        id: ProductId::new(id),
        title: title.to_string(),
        image_url: format!("https://cdn.example.com/products/{id}.png"),
        price: Price::from(price),
    }
}

/// Scratch device storage that is removed when dropped.
pub struct Device {
    dir: TempDir,
}

impl Device {
    /// Create an empty device.
    ///
    /// # Panics
    ///
    /// Panics if a temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Storage backed by this device's directory.
    #[must_use]
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(self.dir.path())
    }

    /// Start an app session: load the cart from this device.
    pub async fn launch(&self) -> CartStore {
        CartStore::load(self.storage(), CART_STORAGE_KEY).await
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
