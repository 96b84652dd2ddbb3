//! Core types for the marketplace cart.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod line_item;
pub mod price;
pub mod quantity;

pub use cart::{CART_STORAGE_KEY, CartChange, CartCollection, CollectionError};
pub use id::*;
pub use line_item::{LineItem, NewLineItem};
pub use price::{Price, PriceError};
pub use quantity::Quantity;
