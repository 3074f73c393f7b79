//! `PostgreSQL` order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use mp_records_core::{CustomerId, OrderId, OrderNumber, OrderTotals};

use super::{
    OrderFilter, OrderStore, PgStore, RepositoryError, StockDecrement, conflict_on_unique,
    count_from, parse_column,
};
use crate::models::{LineItem, Order, ShippingDetails};

const COLUMNS: &str = "id, number, customer_id, shipping, items, products_subtotal, \
                       shipping_cost, total, payment_method, payment_status, status, \
                       tracking_number, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    number: OrderNumber,
    customer_id: Option<Uuid>,
    shipping: Json<ShippingDetails>,
    items: Json<Vec<LineItem>>,
    products_subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    payment_method: String,
    payment_status: String,
    status: String,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::from_uuid(r.id),
            number: r.number,
            customer: r.customer_id.map(CustomerId::from_uuid),
            shipping: r.shipping.0,
            items: r.items.0,
            totals: OrderTotals {
                products_subtotal: r.products_subtotal,
                shipping: r.shipping_cost,
                total: r.total,
            },
            payment_method: parse_column(&r.payment_method)?,
            payment_status: parse_column(&r.payment_status)?,
            status: parse_column(&r.status)?,
            tracking_number: r.tracking_number,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer_order
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::UUID IS NULL OR customer_id = $2)
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.customer)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM site.customer_order WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(self.pool())
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn insert_order(
        &self,
        order: &Order,
        decrements: &[StockDecrement],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        for decrement in decrements {
            let quantity = i32::try_from(decrement.quantity).map_err(|_| {
                RepositoryError::StockExhausted {
                    product: decrement.product,
                    size: decrement.size.clone(),
                }
            })?;
            let result = sqlx::query(
                "UPDATE site.product_size SET stock = stock - $3
                 WHERE product_id = $1 AND name = $2 AND stock >= $3",
            )
            .bind(decrement.product)
            .bind(&decrement.size)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier decrements.
                return Err(RepositoryError::StockExhausted {
                    product: decrement.product,
                    size: decrement.size.clone(),
                });
            }
        }

        sqlx::query(
            r"
            INSERT INTO site.customer_order (
                id, number, customer_id, shipping, items, products_subtotal, shipping_cost,
                total, payment_method, payment_status, status, tracking_number, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(order.id)
        .bind(&order.number)
        .bind(order.customer)
        .bind(Json(&order.shipping))
        .bind(Json(&order.items))
        .bind(order.totals.products_subtotal)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.tracking_number)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order number"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE site.customer_order
            SET number = $2, customer_id = $3, shipping = $4, items = $5,
                products_subtotal = $6, shipping_cost = $7, total = $8, payment_method = $9,
                payment_status = $10, status = $11, tracking_number = $12, notes = $13,
                created_at = $14, updated_at = $15
            WHERE id = $1
            ",
        )
        .bind(order.id)
        .bind(&order.number)
        .bind(order.customer)
        .bind(Json(&order.shipping))
        .bind(Json(&order.items))
        .bind(order.totals.products_subtotal)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.tracking_number)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "order number"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.customer_order WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_orders(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.customer_order")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
