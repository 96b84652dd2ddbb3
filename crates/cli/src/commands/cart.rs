//! Cart commands.
//!
//! Each command loads the cart from `MARKETPLACE_DATA_DIR`, runs inside a
//! [`CartProvider`] scope, waits for its write to land, then logs the cart.

use marketplace_cart::{CartCollection, CartConfig, CartProvider, FileStorage, use_cart};
use marketplace_core::{CartChange, NewLineItem, Price, ProductId};
use tracing::{info, warn};

use super::CommandError;

/// Log the current cart.
///
/// # Errors
///
/// Returns an error if the cart provider is not available.
pub async fn show(config: &CartConfig) -> Result<(), CommandError> {
    with_cart(config, async {
        log_cart(&use_cart()?.products());
        Ok(())
    })
    .await
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns an error if the updated cart could not be written to storage.
pub async fn add(
    config: &CartConfig,
    id: String,
    title: String,
    image_url: String,
    price: Price,
) -> Result<(), CommandError> {
    let item = NewLineItem {
        id: ProductId::new(id),
        title,
        image_url,
        price,
    };

    with_cart(config, async {
        let cart = use_cart()?;
        let write = cart.add_to_cart(item);
        let change = write.change();
        write.await?;

        info!(?change, "Added to cart");
        log_cart(&cart.products());
        Ok(())
    })
    .await
}

/// Add one unit to a product already in the cart.
///
/// # Errors
///
/// Returns an error if the updated cart could not be written to storage.
pub async fn increment(config: &CartConfig, id: String) -> Result<(), CommandError> {
    let id = ProductId::new(id);

    with_cart(config, async {
        let cart = use_cart()?;
        let write = cart.increment(&id);
        report_change(&id, write.change());
        write.await?;

        log_cart(&cart.products());
        Ok(())
    })
    .await
}

/// Remove one unit of a product.
///
/// # Errors
///
/// Returns an error if the updated cart could not be written to storage.
pub async fn decrement(config: &CartConfig, id: String) -> Result<(), CommandError> {
    let id = ProductId::new(id);

    with_cart(config, async {
        let cart = use_cart()?;
        let write = cart.decrement(&id);
        report_change(&id, write.change());
        write.await?;

        log_cart(&cart.products());
        Ok(())
    })
    .await
}

async fn with_cart<F>(config: &CartConfig, scope: F) -> Result<(), CommandError>
where
    F: Future<Output = Result<(), CommandError>>,
{
    let storage = FileStorage::new(&config.data_dir);
    CartProvider::load(storage, &config.storage_key)
        .await
        .run(scope)
        .await
}

fn report_change(id: &ProductId, change: CartChange) {
    match change {
        CartChange::Unchanged => warn!(product_id = %id, "Product is not in the cart"),
        CartChange::Removed => info!(product_id = %id, "Removed from cart"),
        other => info!(product_id = %id, change = ?other, "Quantity updated"),
    }
}

fn log_cart(cart: &CartCollection) {
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }

    for line in cart {
        info!(
            id = %line.id,
            title = %line.title,
            price = %line.price,
            quantity = %line.quantity,
            "  line"
        );
    }
    info!(
        lines = cart.len(),
        units = cart.total_quantity(),
        "Cart summary"
    );
}
