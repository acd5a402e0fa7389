//! Cart operation errors and the notification messages they map to.

use rocketshoes_core::{LineItemError, ProductId};
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Shown whenever the stock service reports nothing available.
pub const OUT_OF_STOCK_MESSAGE: &str = "Requested quantity out of stock";

/// The three cart mutations, used to pick a generic failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Update,
}

impl Operation {
    /// Message shown for any failure other than out-of-stock.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Add => "Error adding product",
            Self::Remove => "Error removing product",
            Self::Update => "Error updating product quantity",
        }
    }
}

/// Why a cart mutation did not happen.
#[derive(Debug, Error)]
pub enum CartError {
    /// Stock service reported no units (or fewer than requested, in strict mode).
    #[error("Product {product_id} out of stock ({available} available)")]
    OutOfStock { product_id: ProductId, available: i64 },

    /// Stock or catalog service could not be reached or answered badly.
    #[error("Service error: {0}")]
    Service(#[from] ApiError),

    /// Update requested for a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    MissingLineItem(ProductId),

    /// Amounts start at one.
    #[error("Invalid amount: {0}")]
    InvalidAmount(u32),

    /// The new cart could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart already had a line item for this product.
    ///
    /// Internal guard only. `add_product` raises the existing line item's
    /// amount under the writer lock, so no operation produces this today.
    #[error("Product {0} is already in the cart")]
    Duplicate(ProductId),
}

impl CartError {
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(self, Self::OutOfStock { .. })
    }

    /// The user-facing message for this failure during `op`.
    #[must_use]
    pub const fn notification(&self, op: Operation) -> &'static str {
        if self.is_out_of_stock() {
            OUT_OF_STOCK_MESSAGE
        } else {
            op.failure_message()
        }
    }
}

impl From<LineItemError> for CartError {
    fn from(err: LineItemError) -> Self {
        match err {
            LineItemError::Duplicate(id) => Self::Duplicate(id),
            LineItemError::Missing(id) => Self::MissingLineItem(id),
            LineItemError::InvalidAmount(amount) => Self::InvalidAmount(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_stock_message_wins_for_every_operation() {
        let err = CartError::OutOfStock {
            product_id: ProductId::new(7),
            available: 0,
        };
        for op in [Operation::Add, Operation::Remove, Operation::Update] {
            assert_eq!(err.notification(op), OUT_OF_STOCK_MESSAGE);
        }
    }

    #[test]
    fn test_other_errors_use_generic_message() {
        let err = CartError::MissingLineItem(ProductId::new(3));
        assert_eq!(err.notification(Operation::Update), "Error updating product quantity");

        let err = CartError::Service(ApiError::NotFound("stock/3".to_string()));
        assert_eq!(err.notification(Operation::Add), "Error adding product");

        let err = CartError::InvalidAmount(0);
        assert_eq!(err.notification(Operation::Remove), "Error removing product");
    }

    #[test]
    fn test_from_line_item_error() {
        assert!(matches!(
            CartError::from(LineItemError::Missing(ProductId::new(1))),
            CartError::MissingLineItem(id) if id == ProductId::new(1)
        ));
        assert!(matches!(
            CartError::from(LineItemError::InvalidAmount(0)),
            CartError::InvalidAmount(0)
        ));
        let err = CartError::from(LineItemError::Duplicate(ProductId::new(4)));
        assert!(matches!(err, CartError::Duplicate(id) if id == ProductId::new(4)));
        assert_eq!(err.notification(Operation::Add), "Error adding product");
    }

    #[test]
    fn test_error_display() {
        let err = CartError::OutOfStock {
            product_id: ProductId::new(7),
            available: 0,
        };
        assert_eq!(err.to_string(), "Product 7 out of stock (0 available)");
    }
}
