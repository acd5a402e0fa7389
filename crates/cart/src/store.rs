//! The cart store: owns the cart, validates changes against stock, and
//! persists every successful mutation.
//!
//! # Concurrency
//!
//! Mutations run one at a time. Each holds the writer lock from its first
//! stock lookup until the new cart is published, so two `add_product` calls
//! for the same product always end with an amount of two. Snapshots never
//! wait on the writer.
//!
//! # Failure reporting
//!
//! [`CartStore::add_product`], [`CartStore::remove_product`] and
//! [`CartStore::update_product_amount`] return nothing: a failure leaves the
//! cart unchanged and produces exactly one notification. The `try_*`
//! variants return the tagged [`CartError`] instead.

use std::sync::Arc;

use rocketshoes_core::{Cart, LineItem, ProductId};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use crate::api::{CatalogService, StockService};
use crate::error::{CartError, Operation};
use crate::notify::NotificationSink;
use crate::storage::{KeyValueStore, load_cart, save_cart};

/// Request to set a line item's amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    /// New absolute amount, not a delta.
    pub amount: u32,
}

/// Shopping cart state manager.
///
/// Create one at startup and share it behind an `Arc`.
pub struct CartStore {
    stock: Arc<dyn StockService>,
    catalog: Arc<dyn CatalogService>,
    storage: Arc<dyn KeyValueStore>,
    notifications: Arc<dyn NotificationSink>,
    strict_stock: bool,
    writer: Mutex<()>,
    current: watch::Sender<Arc<Cart>>,
}

impl CartStore {
    /// Create a store, loading the persisted cart from `storage`.
    ///
    /// A missing or unparseable stored cart starts the store empty.
    pub fn new(
        stock: Arc<dyn StockService>,
        catalog: Arc<dyn CatalogService>,
        storage: Arc<dyn KeyValueStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let cart = load_cart(storage.as_ref());
        debug!(line_items = cart.len(), "Loaded cart");
        let (current, _) = watch::channel(Arc::new(cart));

        Self {
            stock,
            catalog,
            storage,
            notifications,
            strict_stock: false,
            writer: Mutex::new(()),
            current,
        }
    }

    /// Also reject amounts greater than the available stock.
    #[must_use]
    pub fn with_strict_stock(mut self, strict_stock: bool) -> Self {
        self.strict_stock = strict_stock;
        self
    }

    /// The current cart.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Cart> {
        self.current.borrow().clone()
    }

    /// Receiver that is notified with every newly published cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Cart>> {
        self.current.subscribe()
    }

    // =========================================================================
    // Notifying operations
    // =========================================================================

    /// Add one unit of a product.
    ///
    /// A product already in the cart has its amount raised by one; a new
    /// product is fetched from the catalog and appended with amount one.
    #[instrument(skip(self))]
    pub async fn add_product(&self, product_id: ProductId) {
        if let Err(err) = self.try_add_product(product_id).await {
            self.report(Operation::Add, product_id, &err);
        }
    }

    /// Remove a product's line item. Removing an absent product does nothing.
    #[instrument(skip(self))]
    pub async fn remove_product(&self, product_id: ProductId) {
        if let Err(err) = self.try_remove_product(product_id).await {
            self.report(Operation::Remove, product_id, &err);
        }
    }

    /// Set a line item's amount.
    #[instrument(skip(self))]
    pub async fn update_product_amount(&self, request: UpdateProductAmount) {
        if let Err(err) = self.try_update_product_amount(request).await {
            self.report(Operation::Update, request.product_id, &err);
        }
    }

    // =========================================================================
    // Fallible operations
    // =========================================================================

    /// [`CartStore::add_product`], returning the failure instead of
    /// notifying.
    ///
    /// # Errors
    ///
    /// `OutOfStock` when no units are available, `Service` when the stock or
    /// catalog lookup fails, `Storage` when the new cart cannot be persisted.
    pub async fn try_add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let _writer = self.writer.lock().await;
        let cart = self.snapshot();

        let available = self.stock.stock_amount(product_id).await?;
        self.check_stock(product_id, available, 1)?;

        if let Some(item) = cart.get(product_id) {
            let amount = item
                .amount
                .checked_add(1)
                .ok_or(CartError::InvalidAmount(item.amount))?;
            return self.set_amount(&cart, product_id, amount).await;
        }

        let product = self.catalog.product(product_id).await?;
        let next = cart.with_item(LineItem::new(product))?;
        self.commit(next)?;
        info!(%product_id, "Added product to cart");
        Ok(())
    }

    /// [`CartStore::remove_product`], returning the failure instead of
    /// notifying.
    ///
    /// # Errors
    ///
    /// `Storage` when the new cart cannot be persisted.
    pub async fn try_remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let _writer = self.writer.lock().await;
        let cart = self.snapshot();

        let Some(next) = cart.without(product_id) else {
            debug!(%product_id, "Product not in cart, nothing to remove");
            return Ok(());
        };

        self.commit(next)?;
        info!(%product_id, "Removed product from cart");
        Ok(())
    }

    /// [`CartStore::update_product_amount`], returning the failure instead
    /// of notifying.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for zero, `OutOfStock` when no units are available,
    /// `MissingLineItem` when the product is not in the cart, `Service` when
    /// the stock lookup fails, `Storage` when the new cart cannot be persisted.
    pub async fn try_update_product_amount(
        &self,
        request: UpdateProductAmount,
    ) -> Result<(), CartError> {
        if request.amount == 0 {
            return Err(CartError::InvalidAmount(request.amount));
        }

        let _writer = self.writer.lock().await;
        let cart = self.snapshot();
        self.set_amount(&cart, request.product_id, request.amount)
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Re-check stock and set an absolute amount. Caller holds the writer lock.
    async fn set_amount(
        &self,
        cart: &Cart,
        product_id: ProductId,
        amount: u32,
    ) -> Result<(), CartError> {
        let available = self.stock.stock_amount(product_id).await?;
        self.check_stock(product_id, available, amount)?;

        let next = cart.with_amount(product_id, amount)?;
        self.commit(next)?;
        info!(%product_id, amount, "Updated product amount");
        Ok(())
    }

    fn check_stock(
        &self,
        product_id: ProductId,
        available: i64,
        requested: u32,
    ) -> Result<(), CartError> {
        let out_of_stock =
            available <= 0 || (self.strict_stock && i64::from(requested) > available);
        if out_of_stock {
            return Err(CartError::OutOfStock {
                product_id,
                available,
            });
        }
        Ok(())
    }

    /// Persist `next`, then publish it. A failed write publishes nothing.
    fn commit(&self, next: Cart) -> Result<(), CartError> {
        save_cart(self.storage.as_ref(), &next)?;
        self.current.send_replace(Arc::new(next));
        Ok(())
    }

    fn report(&self, op: Operation, product_id: ProductId, err: &CartError) {
        if err.is_out_of_stock() {
            tracing::warn!(%product_id, ?op, error = %err, "Cart operation rejected");
        } else {
            tracing::error!(%product_id, ?op, error = %err, "Cart operation failed");
        }
        self.notifications.error(err.notification(op));
    }
}
