//! Shop customer domain types.
//!
//! Password hashes never appear on [`Customer`]; they are read and written
//! through dedicated store methods so a customer record can be serialized
//! (API responses, backups) without leaking credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mp_records_core::{CustomerId, Email, ProductId};

use super::order::DEFAULT_COUNTRY;
use super::{ValidationError, non_blank, required};

fn default_country() -> String {
    DEFAULT_COUNTRY.to_owned()
}

/// Customer's saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            street: None,
            city: None,
            postal_code: None,
            country: default_country(),
        }
    }
}

/// One stored cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
}

/// A registered shop customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create a customer with an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the first or last name is blank.
    pub fn new(
        email: Email,
        first_name: Option<String>,
        last_name: Option<String>,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: CustomerId::new(),
            email,
            first_name: required(first_name, "first name")?,
            last_name: required(last_name, "last name")?,
            phone: non_blank(phone),
            address: Address::default(),
            cart: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// # Errors
    ///
    /// Returns `ValidationError` if the first or last name is blank or a cart
    /// line has zero quantity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ValidationError::new("first and last name are required"));
        }
        if self.cart.iter().any(|item| item.quantity == 0) {
            return Err(ValidationError::new("cart quantity must be positive"));
        }
        Ok(())
    }

    /// Add to the cart, merging with an existing line for the same product and size.
    pub fn add_to_cart(&mut self, product: ProductId, size: Option<String>, quantity: u32) {
        let quantity = quantity.max(1);
        match self
            .cart
            .iter_mut()
            .find(|item| item.product == product && item.size == size)
        {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.cart.push(CartItem {
                product,
                size,
                quantity,
            }),
        }
    }

    /// Set the quantity of a cart line; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `index` is out of range.
    pub fn set_cart_quantity(&mut self, index: usize, quantity: u32) -> Result<(), ValidationError> {
        if quantity == 0 {
            return self.remove_from_cart(index);
        }
        let item = self
            .cart
            .get_mut(index)
            .ok_or_else(|| ValidationError::new("cart item not found"))?;
        item.quantity = quantity;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ValidationError` if `index` is out of range.
    pub fn remove_from_cart(&mut self, index: usize) -> Result<(), ValidationError> {
        if index >= self.cart.len() {
            return Err(ValidationError::new("cart item not found"));
        }
        self.cart.remove(index);
        Ok(())
    }
}

/// Profile fields a customer can edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

impl CustomerDraft {
    /// # Errors
    ///
    /// Returns `ValidationError` if a provided name is blank.
    pub fn apply_to(self, customer: &mut Customer, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(first_name) = self.first_name {
            customer.first_name = required(Some(first_name), "first name")?;
        }
        if let Some(last_name) = self.last_name {
            customer.last_name = required(Some(last_name), "last name")?;
        }
        if let Some(phone) = self.phone {
            customer.phone = non_blank(Some(phone));
        }
        if let Some(address) = self.address {
            customer.address = address;
        }
        customer.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer::new(
            Email::parse("ala@example.pl").unwrap(),
            Some("Ala".into()),
            Some("Kot".into()),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_to_cart_merges_same_line() {
        let mut c = customer();
        let product = ProductId::new();
        c.add_to_cart(product, Some("M".into()), 1);
        c.add_to_cart(product, Some("M".into()), 2);
        c.add_to_cart(product, Some("L".into()), 1);
        assert_eq!(c.cart.len(), 2);
        assert_eq!(c.cart[0].quantity, 3);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut c = customer();
        c.add_to_cart(ProductId::new(), None, 1);
        c.set_cart_quantity(0, 0).unwrap();
        assert!(c.cart.is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut c = customer();
        assert!(c.set_cart_quantity(3, 1).is_err());
        assert!(c.remove_from_cart(0).is_err());
    }

    #[test]
    fn test_address_defaults_country() {
        let address: Address = serde_json::from_str(r#"{"city": "Gdańsk"}"#).unwrap();
        assert_eq!(address.country, "Polska");
        assert_eq!(address.city.as_deref(), Some("Gdańsk"));
    }

    #[test]
    fn test_serialized_customer_has_no_password() {
        let json = serde_json::to_value(customer()).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert!(!keys.iter().any(|k| k.contains("password")));
    }
}
