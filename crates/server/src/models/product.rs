//! Product domain types.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mp_records_core::{ProductCategory, ProductId, ProductStatus};

use super::{ValidationError, required};

/// Stock held for one size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSize {
    pub name: String,
    pub stock: u32,
}

/// A shop product.
///
/// Size names are unique within a product. Products without sizes do not
/// track stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: ProductCategory,
    #[serde(default)]
    pub sizes: Vec<ProductSize>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Sum of per-size stock.
    #[must_use]
    pub fn total_stock(&self) -> u64 {
        self.sizes.iter().map(|s| u64::from(s.stock)).sum()
    }

    /// Look up a size by name.
    #[must_use]
    pub fn size(&self, name: &str) -> Option<&ProductSize> {
        self.sizes.iter().find(|s| s.name == name)
    }

    /// First image, used as the line item thumbnail.
    #[must_use]
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Check invariants on a record that did not come through a draft.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name is blank, the price is negative,
    /// or a size name is blank or repeated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name is required"));
        }
        validate_price(self.price)?;
        validate_sizes(&self.sizes)
    }
}

/// Product with its computed stock total, as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub total_stock: u64,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            total_stock: product.total_stock(),
            product,
        }
    }
}

/// Product fields accepted by the admin API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    pub sizes: Option<Vec<ProductSize>>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductDraft {
    /// Build a new product.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name or price is missing, the price is
    /// negative, or the size list is invalid.
    pub fn into_product(self, now: DateTime<Utc>) -> Result<Product, ValidationError> {
        let price = self
            .price
            .ok_or_else(|| ValidationError::new("price is required"))?;
        validate_price(price)?;
        let sizes = self.sizes.unwrap_or_default();
        validate_sizes(&sizes)?;

        Ok(Product {
            id: ProductId::new(),
            name: required(self.name, "name")?,
            price,
            category: self.category.unwrap_or_default(),
            sizes,
            images: self.images.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge the provided fields into `product`.
    ///
    /// # Errors
    ///
    /// Same rules as [`ProductDraft::into_product`] for the provided fields.
    pub fn apply_to(self, product: &mut Product, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let name = self.name.map(|n| required(Some(n), "name")).transpose()?;
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(sizes) = &self.sizes {
            validate_sizes(sizes)?;
        }

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(sizes) = self.sizes {
            product.sizes = sizes;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(status) = self.status {
            product.status = status;
        }
        product.updated_at = now;
        Ok(())
    }
}

fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("price cannot be negative"));
    }
    Ok(())
}

fn validate_sizes(sizes: &[ProductSize]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for size in sizes {
        if size.name.trim().is_empty() {
            return Err(ValidationError::new("size name is required"));
        }
        if !seen.insert(size.name.as_str()) {
            return Err(ValidationError(format!("duplicate size: {}", size.name)));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn size(name: &str, stock: u32) -> ProductSize {
        ProductSize {
            name: name.to_string(),
            stock,
        }
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            name: Some("Hoodie".to_string()),
            price: Some(Decimal::new(14_999, 2)),
            sizes: Some(vec![size("S", 2), size("M", 5)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_stock() {
        let product = draft().into_product(Utc::now()).unwrap();
        assert_eq!(product.total_stock(), 7);
        assert_eq!(product.size("M").unwrap().stock, 5);
        assert!(product.size("XL").is_none());
    }

    #[test]
    fn test_duplicate_size_rejected() {
        let mut d = draft();
        d.sizes = Some(vec![size("S", 1), size("S", 2)]);
        assert!(d.into_product(Utc::now()).is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut d = draft();
        d.price = Some(Decimal::new(-1, 0));
        assert!(d.into_product(Utc::now()).is_err());
    }

    #[test]
    fn test_negative_stock_does_not_deserialize() {
        let json = r#"{"name": "S", "stock": -1}"#;
        assert!(serde_json::from_str::<ProductSize>(json).is_err());
    }

    #[test]
    fn test_view_includes_total_stock() {
        let product = draft().into_product(Utc::now()).unwrap();
        let json = serde_json::to_value(ProductView::from(product)).unwrap();
        assert_eq!(json["totalStock"], 7);
        assert_eq!(json["name"], "Hoodie");
        assert_eq!(json["price"], "149.99");
    }

    #[test]
    fn test_main_image() {
        let mut product = draft().into_product(Utc::now()).unwrap();
        assert!(product.main_image().is_none());
        product.images = vec!["/uploads/products/a.jpg".into(), "/uploads/products/b.jpg".into()];
        assert_eq!(product.main_image(), Some("/uploads/products/a.jpg"));
    }
}
