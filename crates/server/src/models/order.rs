//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mp_records_core::{
    CustomerId, Email, OrderId, OrderNumber, OrderStatus, OrderTotals, PaymentMethod,
    PaymentStatus, ProductId,
};

use super::{ValidationError, non_blank, required};

pub(crate) const DEFAULT_COUNTRY: &str = "Polska";

fn default_country() -> String {
    DEFAULT_COUNTRY.to_owned()
}

/// Delivery address and contact captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

impl ShippingDetails {
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first blank field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (value, field) in [
            (&self.first_name, "first name"),
            (&self.last_name, "last name"),
            (&self.phone, "phone"),
            (&self.street, "street"),
            (&self.city, "city"),
            (&self.postal_code, "postal code"),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError(format!("shipping {field} is required")));
            }
        }
        Ok(())
    }
}

/// One product line of an order, copied from the product at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A placed order.
///
/// Number, customer, shipping, items and totals never change after placement;
/// only the status fields, tracking number and notes are editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub number: OrderNumber,
    #[serde(default)]
    pub customer: Option<CustomerId>,
    pub shipping: ShippingDetails,
    pub items: Vec<LineItem>,
    pub totals: OrderTotals,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// # Errors
    ///
    /// Returns `ValidationError` if the shipping details are incomplete or a
    /// line item has zero quantity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.shipping.validate()?;
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(ValidationError::new("line item quantity must be positive"));
        }
        Ok(())
    }
}

/// Admin-editable order fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl OrderUpdate {
    /// Merge the provided fields into `order`. Blank strings clear the field.
    pub fn apply_to(self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(payment_status) = self.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(tracking) = self.tracking_number {
            order.tracking_number = non_blank(Some(tracking));
        }
        if let Some(notes) = self.notes {
            order.notes = non_blank(Some(notes));
        }
        order.updated_at = now;
    }
}

/// Shipping fields as submitted at checkout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl ShippingDraft {
    /// # Errors
    ///
    /// Returns `ValidationError` if a field is missing or the email is invalid.
    pub fn into_details(self) -> Result<ShippingDetails, ValidationError> {
        let email = required(self.email, "shipping email")?;
        Ok(ShippingDetails {
            first_name: required(self.first_name, "shipping first name")?,
            last_name: required(self.last_name, "shipping last name")?,
            email: Email::parse(&email)
                .map_err(|_| ValidationError::new("please provide a valid shipping email"))?,
            phone: required(self.phone, "shipping phone")?,
            street: required(self.street, "shipping street")?,
            city: required(self.city, "shipping city")?,
            postal_code: required(self.postal_code, "shipping postal code")?,
            country: non_blank(self.country).unwrap_or_else(default_country),
        })
    }
}
