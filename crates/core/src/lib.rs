//! Marketplace Core - Shared cart types library.
//!
//! This crate provides the types used by every marketplace component:
//! - `cart` - Cart store, persistence and the provider scope
//! - `cli` - Command-line tool for inspecting and editing a device cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no async runtime. Every cart mutation is expressed here as a reducer
//! over [`CartCollection`], so the store crate only has to decide *when* a
//! reducer runs and where the result is written.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices, quantities, line
//!   items and the ordered cart collection

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
