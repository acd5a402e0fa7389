//! Cart commands.
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - Stock and catalog API
//! - `CART_STORAGE_PATH` - Where the cart is kept between runs

use std::fmt::Write as _;
use std::sync::Arc;

use rocketshoes_cart::{
    ApiClient, ApiError, CartConfig, CartError, CartStore, FileStore, Operation, StorageError,
    TracingSink, UpdateProductAmount,
};
use rocketshoes_core::{Cart, ProductId};
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CliError {
    /// API client could not be built.
    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    /// Storage file could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart rejected the change. Displays the shopper-facing message.
    #[error("{message}")]
    Rejected {
        message: &'static str,
        #[source]
        source: CartError,
    },
}

impl CliError {
    fn rejected(op: Operation, source: CartError) -> Self {
        Self::Rejected {
            message: source.notification(op),
            source,
        }
    }
}

/// Build a cart store backed by the configured API and storage file.
///
/// # Errors
///
/// Returns error if the API client cannot be built or the storage
/// directory cannot be created.
pub fn open_store(config: &CartConfig) -> Result<CartStore, CliError> {
    let api = Arc::new(ApiClient::new(config)?);
    let storage = Arc::new(FileStore::open(&config.storage_path)?);
    tracing::debug!(path = %storage.path().display(), "Opened cart storage");

    Ok(CartStore::new(api.clone(), api, storage, Arc::new(TracingSink))
        .with_strict_stock(config.strict_stock))
}

/// Print the cart.
#[allow(clippy::print_stdout)]
pub fn show(store: &CartStore) {
    print!("{}", render_cart(&store.snapshot()));
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns `CliError::Rejected` if the cart refused the change.
pub async fn add(store: &CartStore, product_id: ProductId) -> Result<(), CliError> {
    store
        .try_add_product(product_id)
        .await
        .map_err(|e| CliError::rejected(Operation::Add, e))?;
    show(store);
    Ok(())
}

/// Remove a product.
///
/// # Errors
///
/// Returns `CliError::Rejected` if the cart refused the change.
pub async fn remove(store: &CartStore, product_id: ProductId) -> Result<(), CliError> {
    store
        .try_remove_product(product_id)
        .await
        .map_err(|e| CliError::rejected(Operation::Remove, e))?;
    show(store);
    Ok(())
}

/// Set a product's amount.
///
/// # Errors
///
/// Returns `CliError::Rejected` if the cart refused the change.
pub async fn update(store: &CartStore, product_id: ProductId, amount: u32) -> Result<(), CliError> {
    store
        .try_update_product_amount(UpdateProductAmount { product_id, amount })
        .await
        .map_err(|e| CliError::rejected(Operation::Update, e))?;
    show(store);
    Ok(())
}

/// Render a cart as a plain-text table.
fn render_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{:>6}  {:<40}  {:>3} x {:>12}  = {:>12}",
            item.id().as_i32(),
            item.product.title,
            item.amount,
            item.unit_price().display(),
            item.line_total().display(),
        );
    }
    let _ = writeln!(
        out,
        "{} item(s), subtotal {}",
        cart.item_count(),
        cart.subtotal().display()
    );
    out
}
