//! The cart: an ordered list of line items, at most one per product.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;
use super::product::LineItem;

/// Errors raised when a cart edit would break its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineItemError {
    /// The cart already holds a line item for this product.
    #[error("Product {0} is already in the cart")]
    Duplicate(ProductId),

    /// The cart holds no line item for this product.
    #[error("Product {0} is not in the cart")]
    Missing(ProductId),

    /// Line item amounts start at one.
    #[error("Invalid amount: {0}")]
    InvalidAmount(u32),
}

/// Ordered sequence of line items, unique by product id.
///
/// Insertion order is kept for display and carries no other meaning. The
/// editing methods return a new `Cart` and leave `self` untouched, so a
/// failed edit never leaves a half-applied cart behind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of every line total.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Append a line item.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the product is already in the cart and
    /// `InvalidAmount` if the item's amount is zero.
    pub fn push(&mut self, item: LineItem) -> Result<(), LineItemError> {
        if item.amount == 0 {
            return Err(LineItemError::InvalidAmount(item.amount));
        }
        if self.contains(item.id()) {
            return Err(LineItemError::Duplicate(item.id()));
        }
        self.items.push(item);
        Ok(())
    }

    /// A copy of this cart with `item` appended.
    ///
    /// # Errors
    ///
    /// See [`Cart::push`].
    pub fn with_item(&self, item: LineItem) -> Result<Self, LineItemError> {
        let mut next = self.clone();
        next.push(item)?;
        Ok(next)
    }

    /// A copy of this cart without the given product, or `None` when the
    /// product was not in the cart to begin with.
    #[must_use]
    pub fn without(&self, id: ProductId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        Some(Self {
            items: self
                .items
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect(),
        })
    }

    /// A copy of this cart with the product's amount set to `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for zero and `Missing` if the product is not
    /// in the cart.
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Result<Self, LineItemError> {
        if amount == 0 {
            return Err(LineItemError::InvalidAmount(amount));
        }
        let mut next = self.clone();
        let item = next
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or(LineItemError::Missing(id))?;
        item.amount = amount;
        Ok(next)
    }
}

impl TryFrom<Vec<LineItem>> for Cart {
    type Error = LineItemError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        let mut cart = Self::new();
        for item in items {
            cart.push(item)?;
        }
        Ok(cart)
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
