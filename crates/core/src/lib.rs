//! MP RECORDS Core - Shared domain types.
//!
//! This crate provides the types used across all MP RECORDS components:
//! - `server` - REST API, backup engine and order placement
//! - `cli` - Command-line tools for migrations, admin accounts and offline backups
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, order numbers,
//!   statuses and order pricing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
