//! Cart lifecycle tests against the in-process mock backend.

use std::sync::Arc;
use std::time::Duration;

use bramble_client::state::{CartState, RegionState};
use bramble_client::storage::{CART_ID_KEY, KeyValueStore};
use bramble_client::{Result, StoreError};
use bramble_core::{LineItemId, VariantId};
use bramble_integration_tests::TestApp;

async fn app_with_region() -> TestApp {
    let app = TestApp::spawn().await;
    app.regions.initialize().await;
    app
}

// ============================================================================
// Cart Creation
// ============================================================================

#[tokio::test]
async fn test_first_add_creates_cart_with_region() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");

    assert_eq!(cart.region_id.as_ref(), Some(&region.id));
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 1);
    assert_eq!(app.backend.count_requests("POST", "/store/carts"), 1);

    // The new cart's id is persisted for restore.
    let cached = app.store.get(CART_ID_KEY).expect("read store");
    assert_eq!(cached.as_deref(), Some(cart.id.as_str()));
}

#[tokio::test]
async fn test_second_add_reuses_existing_cart() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    app.cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("first add");
    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_02"), 2)
        .await
        .expect("second add");

    assert_eq!(cart.items.len(), 2);
    assert_eq!(app.backend.count_requests("POST", "/store/carts"), 1);
}

// ============================================================================
// Quantity Stepping
// ============================================================================

#[tokio::test]
async fn test_increment_bumps_quantity_by_one() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");
    let line_id = cart.items[0].id.clone();

    let cart = app.cart.increment(&line_id).await.expect("increment");
    assert_eq!(cart.items[0].quantity, 2);
    // Totals come back from the server, never computed locally.
    assert!((cart.item_total - 25.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_decrement_above_one_updates_in_place() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 2)
        .await
        .expect("add item");
    let line_id = cart.items[0].id.clone();

    let cart = app.cart.decrement(&line_id).await.expect("decrement");
    assert_eq!(cart.items[0].quantity, 1);

    // The item was updated, never deleted.
    let deletes = app
        .backend
        .requests()
        .iter()
        .filter(|r| r.method == "DELETE")
        .count();
    assert_eq!(deletes, 0);
}

#[tokio::test]
async fn test_decrement_at_one_removes_and_refetches() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");
    let line_id = cart.items[0].id.clone();
    let line_item_path = format!("/store/carts/{}/line-items/{line_id}", cart.id);
    let cart_path = format!("/store/carts/{}", cart.id);

    let cart = app.cart.decrement(&line_id).await.expect("decrement");
    assert!(cart.items.is_empty());
    assert!((cart.total - 0.0).abs() < f64::EPSILON);

    // Quantity zero is expressed as a removal followed by a full refetch.
    assert_eq!(app.backend.count_requests("DELETE", &line_item_path), 1);
    assert_eq!(app.backend.count_requests("POST", &line_item_path), 0);
    assert_eq!(app.backend.count_requests("GET", &cart_path), 1);
}

#[tokio::test]
async fn test_stepping_unknown_line_item_is_precondition_error() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    app.cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");

    let result = app.cart.increment(&LineItemId::new("li_unknown")).await;
    assert!(matches!(result, Err(StoreError::Precondition(_))));
}

// ============================================================================
// In-Flight Mutation Guard
// ============================================================================

#[tokio::test]
async fn test_concurrent_mutation_is_rejected_not_queued() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");
    let line_id = cart.items[0].id.clone();

    app.backend.set_mutation_delay(Duration::from_millis(300));

    let slow_cart = app.cart.clone();
    let slow_line = line_id.clone();
    let slow: tokio::task::JoinHandle<Result<_>> =
        tokio::spawn(async move { slow_cart.increment(&slow_line).await });

    // Give the slow mutation time to take the guard.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let racing = app.cart.increment(&line_id).await;
    assert!(matches!(racing, Err(StoreError::CartBusy)));

    // The first mutation is unaffected by the rejected one.
    let cart = slow.await.expect("join").expect("slow increment");
    assert_eq!(cart.items[0].quantity, 2);
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_restore_refetches_persisted_cart() {
    let app = app_with_region().await;
    let region = app.regions.require().expect("region resolved");

    let cart = app
        .cart
        .add_item(&region.id, &VariantId::new("variant_01"), 1)
        .await
        .expect("add item");

    // A fresh container over the same on-device store, as after relaunch.
    let restored = CartState::new(app.api.clone(), Arc::clone(&app.store) as Arc<dyn KeyValueStore>);
    assert!(restored.cart().is_none());

    restored.restore().await;
    let restored_cart = restored.cart().expect("cart restored");
    assert_eq!(restored_cart.id, cart.id);
    assert_eq!(restored_cart.items.len(), 1);
}

#[tokio::test]
async fn test_restore_without_cached_id_is_noop() {
    let app = app_with_region().await;
    app.cart.restore().await;
    assert!(app.cart.cart().is_none());
    assert_eq!(app.backend.requests().len(), 1); // the region fetch only
}

// ============================================================================
// Region Bootstrap
// ============================================================================

#[tokio::test]
async fn test_region_cached_after_first_bootstrap() {
    let app = TestApp::spawn().await;

    app.regions.initialize().await;
    let region = app.regions.require().expect("region resolved");
    assert_eq!(region.id.as_str(), "reg_eu");
    assert_eq!(region.currency_code, "eur");

    // Second bootstrap over the same store reads the cache, not the API.
    let second =
        RegionState::new(app.api.clone(), Arc::clone(&app.store) as Arc<dyn KeyValueStore>);
    second.initialize().await;
    assert_eq!(second.require().expect("region resolved").id, region.id);
    assert_eq!(app.backend.count_requests("GET", "/store/regions"), 1);
}
