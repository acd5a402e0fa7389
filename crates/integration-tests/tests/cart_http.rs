//! End-to-end cart tests against the mock stock and catalog API.
//!
//! These drive the real `ApiClient`, `FileStore` and `CartStore` together:
//! HTTP lookups, persistence to disk, and reload on restart.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use rocketshoes_cart::{
    ApiClient, ApiError, CART_STORAGE_KEY, CartError, CartStore, CatalogService, FileStore,
    KeyValueStore, OUT_OF_STOCK_MESSAGE, RecordingSink, StockService, UpdateProductAmount,
};
use rocketshoes_core::{Cart, ProductId};
use rocketshoes_integration_tests::{MockApi, temp_storage_path};
use rust_decimal::Decimal;

struct Fixture {
    api: MockApi,
    store: Arc<CartStore>,
    sink: Arc<RecordingSink>,
    storage_path: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if let Some(dir) = self.storage_path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }
}

fn open_store(
    api: &MockApi,
    storage_path: &Path,
    timeout_secs: u64,
) -> (CartStore, Arc<RecordingSink>) {
    let config = api.config(storage_path, timeout_secs).unwrap();
    let client = Arc::new(ApiClient::new(&config).unwrap());
    let storage = Arc::new(FileStore::open(&config.storage_path).unwrap());
    let sink = Arc::new(RecordingSink::new());
    let store = CartStore::new(client.clone(), client, storage, sink.clone());
    (store, sink)
}

async fn fixture() -> Fixture {
    let api = MockApi::start().await.unwrap();
    api.add_product(1, "Tênis de Caminhada Leve Confortável", 179.9);
    api.add_product(3, "Tênis Adidas Duramo Lite 2.0", 219.9);
    api.add_product(5, "Tênis VR Caminhada Confortável Detalhes Couro Masculino", 139.9);
    api.add_product(7, "Tênis Nike Revolution 5", 149.9);

    let storage_path = temp_storage_path();
    let (store, sink) = open_store(&api, &storage_path, 5);
    Fixture {
        api,
        store: Arc::new(store),
        sink,
        storage_path,
    }
}

fn amounts(cart: &Cart) -> Vec<(i32, u32)> {
    cart.iter().map(|i| (i.id().as_i32(), i.amount)).collect()
}

fn id(n: i32) -> ProductId {
    ProductId::new(n)
}

// =============================================================================
// ApiClient
// =============================================================================

#[tokio::test]
async fn test_client_reads_stock_and_product() {
    let f = fixture().await;
    f.api.set_stock(3, 4);
    let config = f.api.config(&f.storage_path, 5).unwrap();
    let client = ApiClient::new(&config).unwrap();

    assert_eq!(client.stock_amount(id(3)).await.unwrap(), 4);

    let product = client.product(id(3)).await.unwrap();
    assert_eq!(product.title, "Tênis Adidas Duramo Lite 2.0");
    assert_eq!(product.price, Decimal::new(2199, 1));
    assert!(product.image.unwrap().ends_with("tenis3.jpg"));
}

#[tokio::test]
async fn test_client_caches_products_but_not_stock() {
    let f = fixture().await;
    f.api.set_stock(1, 2);
    let config = f.api.config(&f.storage_path, 5).unwrap();
    let client = ApiClient::new(&config).unwrap();

    client.product(id(1)).await.unwrap();
    client.product(id(1)).await.unwrap();
    client.stock_amount(id(1)).await.unwrap();
    client.stock_amount(id(1)).await.unwrap();

    assert_eq!(f.api.product_hits(), 1);
    assert_eq!(f.api.stock_hits(), 2);
}

#[tokio::test]
async fn test_client_maps_error_statuses() {
    let f = fixture().await;
    let config = f.api.config(&f.storage_path, 5).unwrap();
    let client = ApiClient::new(&config).unwrap();

    assert!(matches!(
        client.product(id(404)).await,
        Err(ApiError::NotFound(_))
    ));

    f.api.fail_stock_with(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(matches!(
        client.stock_amount(id(1)).await,
        Err(ApiError::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_client_reports_rate_limit() {
    let f = fixture().await;
    f.api.fail_stock_with(StatusCode::TOO_MANY_REQUESTS);
    let config = f.api.config(&f.storage_path, 5).unwrap();
    let client = ApiClient::new(&config).unwrap();

    assert!(matches!(
        client.stock_amount(id(1)).await,
        Err(ApiError::RateLimited(1))
    ));

    f.store.add_product(id(1)).await;
    assert!(f.store.snapshot().is_empty());
    assert_eq!(f.sink.messages(), vec!["Error adding product"]);
}

#[tokio::test]
async fn test_client_rejects_malformed_body() {
    let f = fixture().await;
    f.api
        .add_product_json(9, serde_json::json!({ "id": 9, "name": "no title or price" }));
    let config = f.api.config(&f.storage_path, 5).unwrap();
    let client = ApiClient::new(&config).unwrap();

    assert!(matches!(client.product(id(9)).await, Err(ApiError::Parse(_))));
}

#[tokio::test]
async fn test_client_times_out() {
    let f = fixture().await;
    f.api.set_stock(1, 5);
    f.api.set_delay(Duration::from_secs(3));
    let config = f.api.config(&f.storage_path, 1).unwrap();
    let client = ApiClient::new(&config).unwrap();

    let err = client.stock_amount(id(1)).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err}");
}

// =============================================================================
// CartStore over HTTP
// =============================================================================

#[tokio::test]
async fn test_add_twice_yields_single_line_item() {
    let f = fixture().await;
    f.api.set_stock(5, 2);

    f.store.add_product(id(5)).await;
    f.store.add_product(id(5)).await;

    assert_eq!(amounts(&f.store.snapshot()), vec![(5, 2)]);
    assert!(f.sink.is_empty());
}

#[tokio::test]
async fn test_out_of_stock_add_notifies_once() {
    let f = fixture().await;
    f.api.set_stock(1, 3);
    f.api.set_stock(7, 0);
    f.store.add_product(id(1)).await;
    let before = f.store.snapshot();

    f.store.add_product(id(7)).await;

    assert!(Arc::ptr_eq(&before, &f.store.snapshot()));
    assert_eq!(f.sink.messages(), vec![OUT_OF_STOCK_MESSAGE]);
    // The catalog is never consulted for an out-of-stock product.
    assert_eq!(f.api.product_hits(), 1);
}

#[tokio::test]
async fn test_direct_update_sets_amount() {
    let f = fixture().await;
    f.api.set_stock(3, 5);
    f.store.add_product(id(3)).await;

    f.store
        .update_product_amount(UpdateProductAmount {
            product_id: id(3),
            amount: 4,
        })
        .await;

    assert_eq!(amounts(&f.store.snapshot()), vec![(3, 4)]);
}

#[tokio::test]
async fn test_remove_absent_is_noop() {
    let f = fixture().await;
    f.api.set_stock(1, 3);
    f.store.add_product(id(1)).await;
    let before = f.store.snapshot();

    f.store.remove_product(id(99)).await;

    assert!(Arc::ptr_eq(&before, &f.store.snapshot()));
    assert!(f.sink.is_empty());
}

#[tokio::test]
async fn test_service_outage_leaves_cart_unchanged() {
    let f = fixture().await;
    f.api.set_stock(1, 3);
    f.store.add_product(id(1)).await;
    f.api.fail_stock_with(StatusCode::SERVICE_UNAVAILABLE);

    f.store.add_product(id(1)).await;
    f.store
        .update_product_amount(UpdateProductAmount {
            product_id: id(1),
            amount: 3,
        })
        .await;

    assert_eq!(amounts(&f.store.snapshot()), vec![(1, 1)]);
    assert_eq!(
        f.sink.messages(),
        vec!["Error adding product", "Error updating product quantity"]
    );
}

#[tokio::test]
async fn test_timeout_is_reported_as_generic_failure() {
    let f = fixture().await;
    f.api.set_stock(1, 3);
    f.api.set_delay(Duration::from_secs(3));
    let (store, sink) = open_store(&f.api, &f.storage_path, 1);

    let err = store.try_add_product(id(1)).await.unwrap_err();
    assert!(matches!(err, CartError::Service(ref e) if e.is_timeout()));

    store.add_product(id(1)).await;
    assert!(store.snapshot().is_empty());
    assert_eq!(sink.messages(), vec!["Error adding product"]);
}

#[tokio::test]
async fn test_concurrent_adds_serialize() {
    let f = fixture().await;
    f.api.set_stock(5, 10);
    f.api.set_delay(Duration::from_millis(20));
    let a = tokio::spawn({
        let store = f.store.clone();
        async move { store.add_product(id(5)).await }
    });
    let b = tokio::spawn({
        let store = f.store.clone();
        async move { store.add_product(id(5)).await }
    });
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(amounts(&f.store.snapshot()), vec![(5, 2)]);
    assert!(f.sink.is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_cart_survives_restart() {
    let f = fixture().await;
    f.api.set_stock(1, 9);
    f.api.set_stock(3, 9);
    f.store.add_product(id(3)).await;
    f.store.add_product(id(1)).await;
    f.store.add_product(id(3)).await;

    let (reopened, _) = open_store(&f.api, &f.storage_path, 5);

    assert_eq!(*reopened.snapshot(), *f.store.snapshot());
    assert_eq!(amounts(&reopened.snapshot()), vec![(3, 2), (1, 1)]);
}

#[tokio::test]
async fn test_persisted_value_is_flat_line_item_array() {
    let f = fixture().await;
    f.api.set_stock(1, 9);
    f.store.add_product(id(1)).await;

    let storage = FileStore::open(&f.storage_path).unwrap();
    let raw = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let first = &json.as_array().unwrap()[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["amount"], 1);
    assert_eq!(first["title"], "Tênis de Caminhada Leve Confortável");
}

#[tokio::test]
async fn test_corrupt_storage_starts_empty() {
    let f = fixture().await;
    let storage = FileStore::open(&f.storage_path).unwrap();
    storage.set(CART_STORAGE_KEY, "[{\"id\": \"broken\"").unwrap();

    let (store, sink) = open_store(&f.api, &f.storage_path, 5);

    assert!(store.snapshot().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_corrupt_storage_is_replaced_on_first_change() {
    let f = fixture().await;
    f.api.set_stock(1, 3);
    std::fs::write(&f.storage_path, b"][").unwrap();

    let (store, sink) = open_store(&f.api, &f.storage_path, 5);
    store.add_product(id(1)).await;
    store.add_product(id(1)).await;

    assert_eq!(amounts(&store.snapshot()), vec![(1, 2)]);
    assert!(sink.is_empty());

    let (reopened, _) = open_store(&f.api, &f.storage_path, 5);
    assert_eq!(amounts(&reopened.snapshot()), vec![(1, 2)]);
}
