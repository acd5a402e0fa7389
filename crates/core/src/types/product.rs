//! Catalog products and the cart line items built from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A product record as returned by the catalog service.
///
/// Only the fields the cart needs are typed. Anything else the catalog sends
/// is kept in `extra` so it survives a save/load cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with no extra catalog fields.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            image: None,
            extra: Map::new(),
        }
    }
}

/// One product entry in the cart with its quantity.
///
/// Serialized flat: the catalog record with an `amount` field attached.
///
/// ```json
/// { "id": 1, "title": "Tênis de Caminhada", "price": "179.9", "amount": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub amount: u32,
}

impl LineItem {
    /// A fresh line item for a product just added to the cart.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self { product, amount: 1 }
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::new(self.product.price, CurrencyCode::default())
    }

    /// Unit price times amount.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::new(
            self.product.price * Decimal::from(self.amount),
            CurrencyCode::default(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_serializes_flat() {
        let item = LineItem::new(Product::new(ProductId::new(1), "Tênis", Decimal::new(1799, 1)));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Tênis");
        assert_eq!(json["amount"], 1);
        assert!(json.get("product").is_none());
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_product_keeps_unknown_catalog_fields() {
        let raw = serde_json::json!({
            "id": 3,
            "title": "Tênis Adidas Duramo Lite 2.0",
            "price": 219.9,
            "image": "https://example.com/duramo.jpg",
            "brand": "adidas"
        });
        let product: Product = serde_json::from_value(raw).unwrap();

        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(2199, 1));
        assert_eq!(product.extra.get("brand").unwrap(), "adidas");

        let item = LineItem::new(product);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["brand"], "adidas");
        assert_eq!(json["image"], "https://example.com/duramo.jpg");
    }

    #[test]
    fn test_line_item_amount_is_not_captured_as_extra() {
        let raw = r#"{"id":2,"title":"Tênis","price":"10","amount":4}"#;
        let item: LineItem = serde_json::from_str(raw).unwrap();

        assert_eq!(item.amount, 4);
        assert!(item.product.extra.is_empty());
    }

    #[test]
    fn test_line_total() {
        let mut item = LineItem::new(Product::new(ProductId::new(1), "Tênis", Decimal::new(1050, 2)));
        item.amount = 3;
        assert_eq!(item.line_total().amount, Decimal::new(3150, 2));
    }
}
