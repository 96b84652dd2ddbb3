//! Provider scope and the `use_cart` access guard.
//!
//! A [`CartProvider`] makes one [`CartStore`] the current cart for the
//! duration of a future. Code running inside that future reaches it through
//! [`use_cart`]; code outside gets [`CartError::MissingProvider`].
//!
//! The scope is task-local. Tasks spawned from inside it do not inherit the
//! cart; pass them a cloned [`CartStore`] instead.

use std::future::Future;

use tracing::{debug, instrument};

use crate::error::{CartError, Result};
use crate::storage::CartStorage;
use crate::store::CartStore;

tokio::task_local! {
    static CURRENT_CART: CartStore;
}

/// Owns a cart store for the lifetime of one scope.
#[derive(Debug)]
pub struct CartProvider {
    store: CartStore,
}

impl CartProvider {
    /// Wrap an already loaded store.
    #[must_use]
    pub const fn new(store: CartStore) -> Self {
        Self { store }
    }

    /// Load the cart stored under `key` and wrap it.
    pub async fn load<S: CartStorage>(storage: S, key: &str) -> Self {
        Self::new(CartStore::load(storage, key).await)
    }

    /// The store this provider hands out.
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// Run `scope` with this provider's cart as the current cart.
    ///
    /// When `scope` finishes, the store is closed: queued writes are flushed
    /// and the provider is consumed.
    #[instrument(skip_all, fields(key = %self.store.key()))]
    pub async fn run<F: Future>(self, scope: F) -> F::Output {
        debug!("Entering cart scope");
        let output = CURRENT_CART.scope(self.store.clone(), scope).await;
        self.store.close().await;
        debug!("Left cart scope");
        output
    }
}

/// The current cart.
///
/// # Errors
///
/// Returns [`CartError::MissingProvider`] when called outside
/// [`CartProvider::run`]. This is a wiring mistake, not a data error:
/// propagate it, never substitute an empty cart.
pub fn use_cart() -> Result<CartStore> {
    CURRENT_CART
        .try_with(CartStore::clone)
        .map_err(|_| CartError::MissingProvider)
}
