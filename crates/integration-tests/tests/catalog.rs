//! Product catalog tests against the in-process mock backend.

use bramble_client::services::ProductService;
use bramble_core::{ProductId, RegionId};
use bramble_integration_tests::TestApp;

#[tokio::test]
async fn test_product_list_is_cached_per_region() {
    let app = TestApp::spawn().await;
    let products = ProductService::new(app.api.clone());
    let region = RegionId::new("reg_eu");

    let first = products.list_products(&region).await.expect("first fetch");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].title, "Enamel Mug");

    let second = products.list_products(&region).await.expect("second fetch");
    assert_eq!(second.len(), 1);
    assert_eq!(app.backend.count_requests("GET", "/store/products"), 1);
}

#[tokio::test]
async fn test_product_detail_is_cached() {
    let app = TestApp::spawn().await;
    let products = ProductService::new(app.api.clone());
    let region = RegionId::new("reg_eu");
    let id = ProductId::new("prod_01");

    let product = products.get_product(&id, &region).await.expect("fetch");
    let price = product.variants[0]
        .calculated_price
        .as_ref()
        .expect("region-priced variant");
    assert!((price.calculated_amount - 12.5).abs() < f64::EPSILON);

    products.get_product(&id, &region).await.expect("cached fetch");
    assert_eq!(app.backend.count_requests("GET", "/store/products/prod_01"), 1);
}

#[tokio::test]
async fn test_unknown_product_is_api_error() {
    let app = TestApp::spawn().await;
    let products = ProductService::new(app.api.clone());

    let result = products
        .get_product(&ProductId::new("prod_missing"), &RegionId::new("reg_eu"))
        .await;
    match result {
        Err(bramble_client::StoreError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("not found") || message.contains("Not found") || message.contains("Product"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
