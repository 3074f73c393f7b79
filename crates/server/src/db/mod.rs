//! Persistence for the site's collections.
//!
//! Every collection sits behind an async `*Store` trait. [`PgStore`] implements
//! them against `PostgreSQL`; [`MemoryStore`] implements them in memory for
//! tests and offline tooling. Handlers and services only see `dyn Store`.
//!
//! ## Tables (schema `site`)
//!
//! - `release` - Music releases
//! - `product`, `product_size` - Shop products and per-size stock
//! - `member` - Label members
//! - `message` - Contact form messages
//! - `customer` - Shop customers (password hash, address and cart)
//! - `customer_order` - Placed orders (shipping and items as JSONB snapshots)
//! - `site_settings` - Settings singleton (JSONB)
//! - `admin_user` - Admin panel accounts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p mp-records-cli -- migrate
//! ```

pub mod customers;
pub mod members;
pub mod memory;
pub mod messages;
pub mod orders;
pub mod products;
pub mod releases;
pub mod settings;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use mp_records_core::{
    CustomerId, MemberId, MessageId, OrderId, OrderNumber, OrderStatus, ProductCategory,
    ProductId, ReleaseId, UserId,
};

use crate::models::{
    AdminUser, CartItem, Customer, Member, Message, Order, Product, Release, Settings,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A guarded stock decrement found less stock than requested.
    #[error("insufficient stock for product {product} size {size}")]
    StockExhausted { product: ProductId, size: String },
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Parse a text column into one of the core enums.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::DataCorruption(e.to_string()))
}

/// Stock to take from one product size when an order is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub product: ProductId,
    pub size: String,
    pub quantity: u32,
}

/// Product list filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductFilter {
    /// Only products with status `active`.
    pub active_only: bool,
    pub category: Option<ProductCategory>,
}

/// Order list filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer: Option<CustomerId>,
}

/// Releases, ordered by `position` ascending then newest first.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn list_releases(&self, active_only: bool) -> Result<Vec<Release>, RepositoryError>;
    async fn get_release(&self, id: ReleaseId) -> Result<Option<Release>, RepositoryError>;
    async fn find_release_by_title(&self, title: &str)
    -> Result<Option<Release>, RepositoryError>;
    async fn insert_release(&self, release: &Release) -> Result<(), RepositoryError>;
    /// Replace every field of the release with the same id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such release exists.
    async fn update_release(&self, release: &Release) -> Result<(), RepositoryError>;
    async fn delete_release(&self, id: ReleaseId) -> Result<(), RepositoryError>;
    /// Set several positions at once.
    async fn set_release_positions(
        &self,
        positions: &[(ReleaseId, i32)],
    ) -> Result<(), RepositoryError>;
    async fn count_releases(&self) -> Result<u64, RepositoryError>;
}

/// Products, newest first.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;
    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;
    async fn count_products(&self) -> Result<u64, RepositoryError>;
}

/// Members, ordered by `position` ascending.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn list_members(&self, active_only: bool) -> Result<Vec<Member>, RepositoryError>;
    async fn get_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError>;
    async fn find_member_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Member>, RepositoryError>;
    async fn insert_member(&self, member: &Member) -> Result<(), RepositoryError>;
    async fn update_member(&self, member: &Member) -> Result<(), RepositoryError>;
    async fn delete_member(&self, id: MemberId) -> Result<(), RepositoryError>;
    async fn count_members(&self) -> Result<u64, RepositoryError>;
}

/// Contact messages, newest first.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list_messages(&self) -> Result<Vec<Message>, RepositoryError>;
    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError>;
    /// Returns the updated message.
    async fn mark_message_read(&self, id: MessageId) -> Result<Message, RepositoryError>;
    async fn delete_message(&self, id: MessageId) -> Result<(), RepositoryError>;
    async fn count_messages(&self) -> Result<u64, RepositoryError>;
    async fn count_unread_messages(&self) -> Result<u64, RepositoryError>;
}

/// Orders, newest first.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError>;
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError>;
    /// Store a new order and take its stock in one atomic step.
    ///
    /// Each decrement only applies while the size still holds at least the
    /// requested quantity. Nothing is written unless every decrement applies.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::StockExhausted` if a decrement cannot be applied
    /// - `RepositoryError::Conflict` if the order number is taken
    async fn insert_order(
        &self,
        order: &Order,
        decrements: &[StockDecrement],
    ) -> Result<(), RepositoryError>;
    async fn update_order(&self, order: &Order) -> Result<(), RepositoryError>;
    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError>;
    async fn count_orders(&self) -> Result<u64, RepositoryError>;
}

/// Customers, newest first. Emails are unique.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, RepositoryError>;
    /// Customer and password hash, for login. Imported customers have no hash.
    async fn customer_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Customer, Option<String>)>, RepositoryError>;
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn insert_customer(
        &self,
        customer: &Customer,
        password_hash: Option<&str>,
    ) -> Result<(), RepositoryError>;
    /// Replace the profile, cart and flags. The password hash is untouched.
    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn set_cart(&self, id: CustomerId, cart: &[CartItem]) -> Result<(), RepositoryError>;
    async fn count_customers(&self) -> Result<u64, RepositoryError>;
}

/// The settings singleton.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self) -> Result<Option<Settings>, RepositoryError>;
    async fn save_settings(&self, settings: &Settings) -> Result<(), RepositoryError>;
}

/// Admin accounts. Usernames are unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count_users(&self) -> Result<u64, RepositoryError>;
    async fn get_user(&self, id: UserId) -> Result<Option<AdminUser>, RepositoryError>;
    /// User and password hash, for login.
    async fn user_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError>;
    async fn insert_user(&self, user: &AdminUser, password_hash: &str)
    -> Result<(), RepositoryError>;
}

/// Every collection store, plus a liveness probe.
#[async_trait]
pub trait Store:
    ReleaseStore
    + ProductStore
    + MemberStore
    + MessageStore
    + OrderStore
    + CustomerStore
    + SettingsStore
    + UserStore
{
    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Convert a `COUNT(*)` result.
pub(crate) fn count_from(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| RepositoryError::DataCorruption("negative count".into()))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
