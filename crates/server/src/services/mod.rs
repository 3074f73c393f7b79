//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Admin and customer authentication (Argon2 passwords, JWT bearer tokens)
//! - `backup` - ZIP export/import of every collection plus referenced uploads
//! - `orders` - Order placement (stock check, pricing, atomic stock decrement)
//! - `settings` - Cached access to the settings singleton
//! - `spotify` - Release metadata lookup from public Spotify pages
//! - `uploads` - Storing uploaded images and audio files

pub mod auth;
pub mod backup;
pub mod orders;
pub mod settings;
pub mod spotify;
pub mod uploads;
