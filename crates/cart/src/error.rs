//! Unified error handling with Sentry integration.
//!
//! Every fallible cart operation returns `Result<T, CartError>`. Persistence
//! failures are captured to Sentry by the writer task before they reach the
//! caller, since most callers drop their [`PendingWrite`](crate::PendingWrite)
//! and never look.

use std::sync::Arc;

use thiserror::Error;

use crate::storage::StorageError;

/// Cart-level error type.
///
/// `Clone` because one coalesced write answers every caller that was
/// waiting on it.
#[derive(Debug, Clone, Error)]
pub enum CartError {
    /// [`use_cart`](crate::use_cart) was called outside a provider scope.
    #[error("use_cart must be used within a CartProvider")]
    MissingProvider,

    /// Writing the cart to storage failed. In-memory state is unaffected.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encoding the cart failed.
    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// The store was closed before the write could be queued or finished.
    #[error("Cart store is closed")]
    Closed,
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

impl CartError {
    /// Capture this error to Sentry and log it with the event ID.
    pub fn report(&self, message: &str) {
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "{message}"
        );
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// changes leading up to a failed write.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
