//! `PostgreSQL` customer repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use mp_records_core::{CustomerId, Email};

use super::{CustomerStore, PgStore, RepositoryError, conflict_on_unique, count_from};
use crate::models::{Address, CartItem, Customer};

const COLUMNS: &str =
    "id, email, first_name, last_name, phone, address, cart, active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    email: Email,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    address: Json<Address>,
    cart: Json<Vec<CartItem>>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    password_hash: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Self {
            id: CustomerId::from_uuid(r.id),
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            address: r.address.0,
            cart: r.cart.0,
            active: r.active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn customer_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Customer, Option<String>)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {COLUMNS}, password_hash FROM site.customer WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|r| (Customer::from(r.customer), r.password_hash)))
    }

    async fn insert_customer(
        &self,
        customer: &Customer,
        password_hash: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO site.customer (
                id, email, password_hash, first_name, last_name, phone, address, cart,
                active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(customer.id)
        .bind(&customer.email)
        .bind(password_hash)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(Json(&customer.address))
        .bind(Json(&customer.cart))
        .bind(customer.active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE site.customer
            SET email = $2, first_name = $3, last_name = $4, phone = $5, address = $6,
                cart = $7, active = $8, created_at = $9, updated_at = $10
            WHERE id = $1
            ",
        )
        .bind(customer.id)
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(Json(&customer.address))
        .bind(Json(&customer.cart))
        .bind(customer.active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_cart(&self, id: CustomerId, cart: &[CartItem]) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE site.customer SET cart = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(cart))
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_customers(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.customer")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
