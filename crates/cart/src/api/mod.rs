//! Stock and catalog service clients.
//!
//! # Architecture
//!
//! - [`StockService`] and [`CatalogService`] are the narrow seams the cart
//!   store talks through, so tests and embedders can swap in their own
//! - [`ApiClient`] implements both against the storefront REST API using
//!   `reqwest`, with product records cached via `moka`
//! - Stock is never cached: it is the authoritative inventory count
//!
//! # Endpoints
//!
//! - `GET {base}/stock/{id}` → `{ "id": 1, "amount": 3 }`
//! - `GET {base}/products/{id}` → product record

mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the stock or catalog service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API. Carries the `Retry-After` seconds for logs;
    /// the cart does not retry and reports a generic failure.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the failure came from the request timing out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Stock record returned by `GET /stock/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Stock {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub amount: i64,
}

/// Source of authoritative stock quantities.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Current available quantity for a product.
    async fn stock_amount(&self, product_id: ProductId) -> Result<i64, ApiError>;
}

/// Source of product display data.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Product record for a product id.
    async fn product(&self, product_id: ProductId) -> Result<Product, ApiError>;
}
