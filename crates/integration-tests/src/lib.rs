//! Integration tests for the RocketShoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! No external services are needed: [`MockApi`] serves the stock and
//! catalog endpoints from an in-process `axum` router bound to an
//! ephemeral localhost port.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_cart::{CartConfig, ConfigError};
use serde_json::{Value, json};

/// Shared, mutable behaviour of the mock API.
#[derive(Default)]
struct MockState {
    stock: Mutex<HashMap<i32, i64>>,
    products: Mutex<HashMap<i32, Value>>,
    stock_status: Mutex<Option<StatusCode>>,
    delay: Mutex<Duration>,
    stock_hits: AtomicUsize,
    product_hits: AtomicUsize,
}

/// Handle to a running mock of the stock and catalog API.
#[derive(Clone)]
pub struct MockApi {
    state: Arc<MockState>,
    base_url: String,
}

impl MockApi {
    /// Start the mock server on `127.0.0.1:0`.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> io::Result<Self> {
        let state = Arc::new(MockState::default());

        let router = Router::new()
            .route("/stock/{id}", get(stock_handler))
            .route("/products/{id}", get(product_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                panic!("mock API server stopped: {e}");
            }
        });

        Ok(Self {
            state,
            base_url: format!("http://{addr}"),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the stock amount served for a product.
    pub fn set_stock(&self, id: i32, amount: i64) {
        lock(&self.state.stock).insert(id, amount);
    }

    /// Register a catalog product with a title and a price.
    pub fn add_product(&self, id: i32, title: &str, price: f64) {
        self.add_product_json(
            id,
            json!({
                "id": id,
                "title": title,
                "price": price,
                "image": format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/modulo-redux/tenis{id}.jpg"),
            }),
        );
    }

    /// Register a raw catalog record.
    pub fn add_product_json(&self, id: i32, record: Value) {
        lock(&self.state.products).insert(id, record);
    }

    /// Make every stock request answer with `status`.
    pub fn fail_stock_with(&self, status: StatusCode) {
        *lock(&self.state.stock_status) = Some(status);
    }

    /// Delay every response by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.state.delay) = delay;
    }

    #[must_use]
    pub fn stock_hits(&self) -> usize {
        self.state.stock_hits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_hits(&self) -> usize {
        self.state.product_hits.load(Ordering::SeqCst)
    }

    /// Cart configuration pointing at this server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the generated values fail to parse.
    pub fn config(&self, storage_path: &std::path::Path, timeout_secs: u64) -> Result<CartConfig, ConfigError> {
        let base_url = self.base_url.clone();
        let storage_path = storage_path.display().to_string();
        let timeout = timeout_secs.to_string();
        CartConfig::from_lookup(move |key| match key {
            "CART_API_BASE_URL" => Some(base_url.clone()),
            "CART_STORAGE_PATH" => Some(storage_path.clone()),
            "CART_REQUEST_TIMEOUT_SECS" => Some(timeout.clone()),
            _ => None,
        })
    }
}

/// A unique storage file path under the system temp directory.
#[must_use]
pub fn temp_storage_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("rocketshoes_it_{}", uuid::Uuid::new_v4()))
        .join("storage.json")
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn apply_delay(state: &MockState) {
    let delay = *lock(&state.delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

async fn stock_handler(State(state): State<Arc<MockState>>, Path(id): Path<i32>) -> Response {
    state.stock_hits.fetch_add(1, Ordering::SeqCst);
    apply_delay(&state).await;

    let forced = *lock(&state.stock_status);
    if let Some(status) = forced {
        return (status, "stock service unavailable").into_response();
    }

    let amount = lock(&state.stock).get(&id).copied();
    amount.map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |amount| Json(json!({ "id": id, "amount": amount })).into_response(),
    )
}

async fn product_handler(State(state): State<Arc<MockState>>, Path(id): Path<i32>) -> Response {
    state.product_hits.fetch_add(1, Ordering::SeqCst);
    apply_delay(&state).await;

    let record = lock(&state.products).get(&id).cloned();
    record.map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |record| Json(record).into_response(),
    )
}
