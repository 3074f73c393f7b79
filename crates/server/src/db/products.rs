//! `PostgreSQL` product repository.
//!
//! Per-size stock lives in `site.product_size`; the `stock >= 0` check there
//! backs the guarded decrement in the order repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use mp_records_core::ProductId;

use super::{PgStore, ProductFilter, ProductStore, RepositoryError, count_from, parse_column};
use crate::models::{Product, ProductSize};

const COLUMNS: &str =
    "id, name, price, category, images, description, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    category: String,
    images: Vec<String>,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SizeRow {
    product_id: Uuid,
    name: String,
    stock: i32,
}

impl ProductRow {
    fn into_product(self, sizes: Vec<ProductSize>) -> Result<Product, RepositoryError> {
        Ok(Product {
            id: ProductId::from_uuid(self.id),
            name: self.name,
            price: self.price,
            category: parse_column(&self.category)?,
            sizes,
            images: self.images,
            description: self.description,
            status: parse_column(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    /// Attach sizes to product rows, preserving row order.
    async fn with_sizes(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let size_rows = sqlx::query_as::<_, SizeRow>(
            "SELECT product_id, name, stock FROM site.product_size
             WHERE product_id = ANY($1)
             ORDER BY product_id, position",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut sizes: HashMap<Uuid, Vec<ProductSize>> = HashMap::new();
        for row in size_rows {
            let stock = u32::try_from(row.stock).map_err(|_| {
                RepositoryError::DataCorruption(format!("negative stock for {}", row.product_id))
            })?;
            sizes.entry(row.product_id).or_default().push(ProductSize {
                name: row.name,
                stock,
            });
        }

        rows.into_iter()
            .map(|row| {
                let product_sizes = sizes.remove(&row.id).unwrap_or_default();
                row.into_product(product_sizes)
            })
            .collect()
    }

    async fn fetch_one_product(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM site.product WHERE {clause} ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(self.with_sizes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn write_sizes(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM site.product_size WHERE product_id = $1")
        .bind(product.id)
        .execute(&mut **tx)
        .await?;

    for (position, size) in product.sizes.iter().enumerate() {
        let stock = i32::try_from(size.stock)
            .map_err(|_| RepositoryError::Conflict(format!("stock too large for {}", size.name)))?;
        let position = i32::try_from(position)
            .map_err(|_| RepositoryError::Conflict("too many sizes".to_owned()))?;
        sqlx::query(
            "INSERT INTO site.product_size (product_id, name, stock, position)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(product.id)
        .bind(&size.name)
        .bind(stock)
        .bind(position)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM site.product
             WHERE (status = 'active' OR NOT $1)
               AND ($2::TEXT IS NULL OR category = $2)
             ORDER BY created_at DESC"
        ))
        .bind(filter.active_only)
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(self.pool())
        .await?;
        self.with_sizes(rows).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM site.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(self.with_sizes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        self.fetch_one_product("name = $1", name).await
    }

    async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            r"
            INSERT INTO site.product (
                id, name, price, category, images, description, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.category.as_str())
        .bind(&product.images)
        .bind(&product.description)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;
        write_sizes(&mut tx, product).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let result = sqlx::query(
            r"
            UPDATE site.product
            SET name = $2, price = $3, category = $4, images = $5, description = $6,
                status = $7, created_at = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.category.as_str())
        .bind(&product.images)
        .bind(&product.description)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        write_sizes(&mut tx, product).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.product WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.product")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
