//! RocketShoes cart state manager.
//!
//! Tracks which products a shopper has added and in what quantity, checks
//! every change against the remote stock service, and mirrors the cart to a
//! local key-value store so it survives restarts.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the cart and serializes every mutation
//! - [`api`] holds the stock and catalog service traits plus a `reqwest` client
//! - [`storage`] holds the key-value store trait plus memory and file backends
//! - [`notify`] holds the user-facing notification sink
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rocketshoes_cart::{ApiClient, CartConfig, CartStore, FileStore, TracingSink};
//!
//! let config = CartConfig::from_env()?;
//! let api = Arc::new(ApiClient::new(&config)?);
//! let store = CartStore::new(
//!     api.clone(),
//!     api,
//!     Arc::new(FileStore::open(&config.storage_path)?),
//!     Arc::new(TracingSink),
//! )
//! .with_strict_stock(config.strict_stock);
//!
//! store.add_product(ProductId::new(1)).await;
//! println!("{} items", store.snapshot().item_count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;

pub use api::{ApiClient, ApiError, CatalogService, StockService};
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, OUT_OF_STOCK_MESSAGE, Operation};
pub use notify::{Notification, NotificationSink, RecordingSink, TracingSink};
pub use storage::{CART_STORAGE_KEY, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{CartStore, UpdateProductAmount};
