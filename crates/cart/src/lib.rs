//! Marketplace cart store.
//!
//! Holds the shopper's cart in memory, mirrors it to device storage after
//! every change, and hands it out to the rest of the app through a provider
//! scope.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the current [`CartCollection`]. Mutations run the
//!   reducers from `marketplace-core` under a single write lock, publish the
//!   result immediately, then queue a write.
//! - A single writer task per store drains the queue and writes the newest
//!   published cart to [`CartStorage`]. Callers get a [`PendingWrite`] they
//!   can await for the outcome or drop.
//! - [`CartProvider`] scopes a store to a future; [`use_cart`] looks it up
//!   and fails with [`CartError::MissingProvider`] outside that scope.
//!
//! # Example
//!
//! ```rust,no_run
//! use marketplace_cart::{CartProvider, CartStore, MemoryStorage, use_cart};
//! use marketplace_core::{CART_STORAGE_KEY, ProductId};
//!
//! # async fn demo() -> marketplace_cart::Result<()> {
//! let store = CartStore::load(MemoryStorage::new(), CART_STORAGE_KEY).await;
//!
//! CartProvider::new(store)
//!     .run(async {
//!         let cart = use_cart()?;
//!         cart.increment(&ProductId::new("1")).await
//!     })
//!     .await
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, LogFormat};
pub use error::{CartError, Result};
pub use marketplace_core::CartCollection;
pub use provider::{CartProvider, use_cart};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{CartStore, PendingWrite};
