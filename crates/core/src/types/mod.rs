//! Core types for MP RECORDS.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::{OrderNumber, OrderNumberError};
pub use price::{FREE_SHIPPING_THRESHOLD, OrderTotals, SHIPPING_FEE};
pub use status::*;
