//! Domain models.
//!
//! These are validated domain objects, separate from database row types. Each
//! collection also has a `*Draft` type accepted by the REST API: every field
//! optional, turned into a full record on create and merged into an existing
//! record on update.
//!
//! Records serialize with `camelCase` field names; the same form is written to
//! backup manifests.

pub mod customer;
pub mod member;
pub mod message;
pub mod order;
pub mod product;
pub mod release;
pub mod settings;
pub mod user;

pub use customer::{Address, CartItem, Customer, CustomerDraft};
pub use member::{Member, MemberDraft};
pub use message::{MAX_MESSAGE_LENGTH, Message, MessageDraft};
pub use order::{LineItem, Order, OrderUpdate, ShippingDetails, ShippingDraft};
pub use product::{Product, ProductDraft, ProductSize, ProductView};
pub use release::{Release, ReleaseDraft};
pub use settings::{PageHeadline, Settings, SocialLinks};
pub use user::AdminUser;

/// A record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Take a required, non-blank text field.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError(format!("{field} is required"))),
    }
}

/// Trim a text field, keeping it only when non-blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
