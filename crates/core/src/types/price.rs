//! Order pricing using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subtotal from which shipping is free (inclusive).
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Flat shipping fee charged below [`FREE_SHIPPING_THRESHOLD`].
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

/// Price summary stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of unit price times quantity over all line items.
    pub products_subtotal: Decimal,
    /// Shipping charge.
    pub shipping: Decimal,
    /// `products_subtotal + shipping`.
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals for a products subtotal.
    #[must_use]
    pub fn from_subtotal(products_subtotal: Decimal) -> Self {
        let shipping = if products_subtotal >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            SHIPPING_FEE
        };
        Self {
            products_subtotal,
            shipping,
            total: products_subtotal + shipping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_free() {
        let totals = OrderTotals::from_subtotal(Decimal::new(20_000, 2));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(200, 0));
    }

    #[test]
    fn test_just_below_threshold_pays_fee() {
        let totals = OrderTotals::from_subtotal(Decimal::new(19_999, 2));
        assert_eq!(totals.shipping, Decimal::new(15, 0));
        assert_eq!(totals.total, Decimal::new(21_499, 2));
    }

    #[test]
    fn test_serializes_as_strings() {
        let totals = OrderTotals::from_subtotal(Decimal::new(4_999, 2));
        let json = serde_json::to_value(totals).unwrap_or_default();
        assert_eq!(json["productsSubtotal"], "49.99");
        assert_eq!(json["shipping"], "15");
        assert_eq!(json["total"], "64.99");
    }
}
