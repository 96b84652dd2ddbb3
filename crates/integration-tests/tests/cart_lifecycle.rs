//! End-to-end cart lifecycle against file-backed device storage.
//!
//! Each test simulates app sessions: launch (load), mutate, close, relaunch.

#![allow(clippy::unwrap_used)]

use marketplace_cart::{CartError, CartProvider, CartStorage, use_cart};
use marketplace_core::{CART_STORAGE_KEY, CartCollection, ProductId};
use marketplace_integration_tests::{Device, product};

fn quantities(cart: &CartCollection) -> Vec<(String, u32)> {
    cart.iter()
        .map(|line| (line.id.to_string(), line.quantity.get()))
        .collect()
}

// =============================================================================
// Shopper Flows
// =============================================================================

#[tokio::test]
async fn test_shirt_survives_restart() {
    let device = Device::new();

    let store = device.launch().await;
    assert!(store.products().is_empty());

    store
        .add_to_cart(product("1", "Shirt", 10))
        .await
        .unwrap();
    assert_eq!(quantities(&store.products()), vec![("1".to_string(), 1)]);

    store.increment(&ProductId::new("1")).await.unwrap();
    assert_eq!(quantities(&store.products()), vec![("1".to_string(), 2)]);

    store.decrement(&ProductId::new("1")).await.unwrap();
    assert_eq!(quantities(&store.products()), vec![("1".to_string(), 1)]);
    let before_restart = store.products();
    store.close().await;

    let relaunched = device.launch().await;
    assert_eq!(relaunched.products(), before_restart);

    let line = relaunched.products().get(&ProductId::new("1")).cloned().unwrap();
    assert_eq!(line.title, "Shirt");
    assert_eq!(line.image_url, "https://cdn.example.com/products/1.png");
}

#[tokio::test]
async fn test_order_is_kept_across_restart() {
    let device = Device::new();

    let store = device.launch().await;
    let _ = store.add_to_cart(product("a", "Apron", 12));
    let _ = store.add_to_cart(product("b", "Bag", 30));
    let _ = store.add_to_cart(product("a", "Apron", 12));
    let _ = store.add_to_cart(product("c", "Cap", 8));
    store.close().await;

    let relaunched = device.launch().await;
    assert_eq!(
        quantities(&relaunched.products()),
        vec![
            ("a".to_string(), 2),
            ("b".to_string(), 1),
            ("c".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_removed_line_stays_removed_after_restart() {
    let device = Device::new();

    let store = device.launch().await;
    store.add_to_cart(product("a", "Apron", 12)).await.unwrap();
    store.add_to_cart(product("b", "Bag", 30)).await.unwrap();
    store.decrement(&ProductId::new("a")).await.unwrap();
    store.close().await;

    let relaunched = device.launch().await;
    assert_eq!(quantities(&relaunched.products()), vec![("b".to_string(), 1)]);
}

#[tokio::test]
async fn test_unknown_ids_leave_stored_cart_alone() {
    let device = Device::new();

    let store = device.launch().await;
    store.add_to_cart(product("a", "Apron", 12)).await.unwrap();
    let stored_before = device.storage().get(CART_STORAGE_KEY).await.unwrap();

    store.increment(&ProductId::new("ghost")).await.unwrap();
    store.decrement(&ProductId::new("ghost")).await.unwrap();
    store.close().await;

    let stored_after = device.storage().get(CART_STORAGE_KEY).await.unwrap();
    assert_eq!(stored_before, stored_after);
}

// =============================================================================
// Stored Data Recovery
// =============================================================================

#[tokio::test]
async fn test_corrupt_storage_starts_empty_and_is_overwritten() {
    let device = Device::new();
    device
        .storage()
        .set(CART_STORAGE_KEY, "this is not a cart")
        .await
        .unwrap();

    let store = device.launch().await;
    assert!(store.products().is_empty());

    store.add_to_cart(product("1", "Shirt", 10)).await.unwrap();
    store.close().await;

    let raw = device.storage().get(CART_STORAGE_KEY).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["id"], "1");
    assert_eq!(value[0]["quantity"], 1);
}

#[tokio::test]
async fn test_cart_written_by_previous_app_version_loads() {
    let device = Device::new();
    device
        .storage()
        .set(
            CART_STORAGE_KEY,
            r#"[{"id":"7","title":"Mug","image_url":"https://cdn.example.com/7.png","price":14.5,"quantity":3}]"#,
        )
        .await
        .unwrap();

    let store = device.launch().await;
    assert_eq!(quantities(&store.products()), vec![("7".to_string(), 3)]);
    assert_eq!(store.products().total_quantity(), 3);
}

#[tokio::test]
async fn test_catalog_prices_survive_restart_digit_for_digit() {
    let device = Device::new();
    device
        .storage()
        .set(
            CART_STORAGE_KEY,
            r#"[{"id":"1","title":"Print","image_url":"u","price":1234567.123456789012345,"quantity":1},{"id":"2","title":"Yacht","image_url":"u","price":1e30,"quantity":1}]"#,
        )
        .await
        .unwrap();

    let store = device.launch().await;
    assert_eq!(store.products().len(), 2);
    store.increment(&ProductId::new("2")).await.unwrap();
    store.close().await;

    let restarted = device.launch().await;
    let prices: Vec<_> = restarted
        .products()
        .iter()
        .map(|line| line.price.to_string())
        .collect();
    assert_eq!(prices, vec!["1234567.123456789012345", "1e30"]);
    assert_eq!(restarted.products().total_quantity(), 3);
}

// =============================================================================
// Provider Scope
// =============================================================================

#[tokio::test]
async fn test_provider_scope_round_trip() {
    let device = Device::new();

    CartProvider::load(device.storage(), CART_STORAGE_KEY)
        .await
        .run(async {
            let cart = use_cart()?;
            let _ = cart.add_to_cart(product("1", "Shirt", 10));
            let _ = cart.increment(&ProductId::new("1"));
            Ok::<_, CartError>(())
        })
        .await
        .unwrap();

    // Scope exit flushed both writes
    let store = device.launch().await;
    assert_eq!(quantities(&store.products()), vec![("1".to_string(), 2)]);
}

#[tokio::test]
async fn test_use_cart_outside_provider_fails_fast() {
    let result = async {
        let cart = use_cart()?;
        let _ = cart.add_to_cart(product("1", "Shirt", 10));
        Ok::<_, CartError>(())
    }
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, CartError::MissingProvider));
    assert_eq!(err.to_string(), "use_cart must be used within a CartProvider");
}
