//! Status and category enums for the site's collections.
//!
//! Every enum serializes as `snake_case` text, which is also the form stored in
//! the database and written to backup archives.

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted enum value is unknown.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored text form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Badge shown next to a release on the public site.
    #[derive(Default)]
    ReleaseHighlight("release highlight") {
        #[default]
        None => "none",
        New => "new",
        Hot => "hot",
        Featured => "featured",
    }
}

text_enum! {
    /// Shop category of a product.
    #[derive(Default)]
    ProductCategory("product category") {
        Clothing => "clothing",
        Accessories => "accessories",
        Music => "music",
        #[default]
        Other => "other",
    }
}

text_enum! {
    /// Visibility of a product in the shop.
    #[derive(Default)]
    ProductStatus("product status") {
        #[default]
        Active => "active",
        Hidden => "hidden",
        SoldOut => "sold_out",
    }
}

text_enum! {
    /// How the customer intends to pay.
    #[derive(Default)]
    PaymentMethod("payment method") {
        #[default]
        Transfer => "transfer",
        Blik => "blik",
        Card => "card",
        Paypal => "paypal",
        CashOnDelivery => "cash_on_delivery",
    }
}

text_enum! {
    /// Payment state of an order. Set by the admin panel.
    #[derive(Default)]
    PaymentStatus("payment status") {
        #[default]
        Pending => "pending",
        Paid => "paid",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Fulfilment state of an order. Set by the admin panel.
    #[derive(Default)]
    OrderStatus("order status") {
        #[default]
        New => "new",
        Confirmed => "confirmed",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Admin panel account role.
    #[derive(Default)]
    AdminRole("admin role") {
        /// Full access, including backups and account setup.
        #[default]
        Admin => "admin",
        /// Content management.
        Editor => "editor",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(method).unwrap();
            assert_eq!(json, format!("\"{method}\""));
        }
    }

    #[test]
    fn test_from_str_roundtrip() {
        for category in ProductCategory::ALL {
            assert_eq!(category.as_str().parse::<ProductCategory>().unwrap(), *category);
        }
        assert_eq!(
            "sold_out".parse::<ProductStatus>().unwrap(),
            ProductStatus::SoldOut
        );
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "shipping".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "shipping");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ReleaseHighlight::default(), ReleaseHighlight::None);
        assert_eq!(ProductCategory::default(), ProductCategory::Other);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Transfer);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
        assert_eq!(OrderStatus::default(), OrderStatus::New);
    }
}
