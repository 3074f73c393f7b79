//! Order placement.
//!
//! Validates a checkout against live product data, snapshots the line items,
//! prices the order and stores it together with its stock decrements. Nothing
//! is written unless every line item passes; the store applies all stock
//! decrements and the order insert as one atomic step.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use mp_records_core::{
    CustomerId, OrderId, OrderNumber, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ProductId,
};

use crate::db::{RepositoryError, StockDecrement, Store};
use crate::models::{LineItem, Order, Product, ShippingDraft, ValidationError, non_blank};

/// How many order numbers to try before giving up on collisions.
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for {product} ({size})")]
    InsufficientStock { product: String, size: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Every generated order number collided with an existing one.
    #[error("could not allocate a unique order number")]
    NumberExhausted,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One requested line at checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Checkout request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    #[serde(default)]
    pub shipping: ShippingDraft,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Place an order with randomly generated order numbers.
///
/// # Errors
///
/// See [`place_order_with`].
pub async fn place_order(
    store: &dyn Store,
    request: PlaceOrder,
    customer: Option<CustomerId>,
) -> Result<Order, OrderError> {
    place_order_with(store, request, customer, Utc::now(), OrderNumber::generate).await
}

/// Place an order, drawing order numbers from `next_number`.
///
/// When `customer` is set, that customer's stored cart is cleared after the
/// order is stored.
///
/// # Errors
///
/// - `OrderError::EmptyCart` / `InvalidQuantity` / `Validation` for bad input
/// - `OrderError::ProductNotFound` if any item references a missing product
/// - `OrderError::InsufficientStock` if a size is unknown or short on stock,
///   including when stock ran out between validation and the write
/// - `OrderError::NumberExhausted` if every attempted number was taken
#[instrument(skip_all, fields(items = request.items.len(), customer = ?customer))]
pub async fn place_order_with(
    store: &dyn Store,
    request: PlaceOrder,
    customer: Option<CustomerId>,
    now: DateTime<Utc>,
    mut next_number: impl FnMut(NaiveDate) -> OrderNumber + Send,
) -> Result<Order, OrderError> {
    if request.items.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    if request.items.iter().any(|item| item.quantity == 0) {
        return Err(OrderError::InvalidQuantity);
    }
    let shipping = request.shipping.into_details()?;

    let products = load_products(store, &request.items).await?;
    let (items, decrements) = snapshot_items(&request.items, &products)?;

    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
    let mut order = Order {
        id: OrderId::new(),
        number: next_number(now.date_naive()),
        customer,
        shipping,
        items,
        totals: OrderTotals::from_subtotal(subtotal),
        payment_method: request.payment_method.unwrap_or_default(),
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::New,
        tracking_number: None,
        notes: non_blank(request.notes),
        created_at: now,
        updated_at: now,
    };

    let mut attempt = 1;
    loop {
        match store.insert_order(&order, &decrements).await {
            Ok(()) => break,
            Err(RepositoryError::Conflict(_)) if attempt < MAX_NUMBER_ATTEMPTS => {
                tracing::warn!(order_number = %order.number, attempt, "order number collision");
                attempt += 1;
                order.number = next_number(now.date_naive());
            }
            Err(RepositoryError::Conflict(_)) => return Err(OrderError::NumberExhausted),
            Err(RepositoryError::StockExhausted { product, size }) => {
                let name = order
                    .items
                    .iter()
                    .find(|item| item.product == product)
                    .map_or_else(|| product.to_string(), |item| item.name.clone());
                return Err(OrderError::InsufficientStock {
                    product: name,
                    size,
                });
            }
            Err(other) => return Err(other.into()),
        }
    }

    tracing::info!(
        order_number = %order.number,
        total = %order.totals.total,
        "order placed"
    );

    if let Some(customer) = customer
        && let Err(e) = store.set_cart(customer, &[]).await
    {
        tracing::warn!(customer_id = %customer, error = %e, "failed to clear cart after order");
    }

    Ok(order)
}

/// Load every distinct product referenced by the request.
async fn load_products(
    store: &dyn Store,
    items: &[OrderItemRequest],
) -> Result<HashMap<ProductId, Product>, OrderError> {
    let mut products = HashMap::new();
    for item in items {
        if products.contains_key(&item.product_id) {
            continue;
        }
        let product = store
            .get_product(item.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(item.product_id))?;
        products.insert(item.product_id, product);
    }
    Ok(products)
}

/// Build line item snapshots and the stock decrements they need.
///
/// Quantities of repeated product/size lines are summed before checking
/// stock, so two lines cannot together take more than is available.
fn snapshot_items(
    requested: &[OrderItemRequest],
    products: &HashMap<ProductId, Product>,
) -> Result<(Vec<LineItem>, Vec<StockDecrement>), OrderError> {
    let mut items = Vec::with_capacity(requested.len());
    let mut wanted: Vec<StockDecrement> = Vec::new();

    for item in requested {
        let product = products
            .get(&item.product_id)
            .ok_or(OrderError::ProductNotFound(item.product_id))?;
        let size = non_blank(item.size.clone());

        if let Some(size_name) = &size
            && !product.sizes.is_empty()
        {
            match wanted
                .iter_mut()
                .find(|d| d.product == product.id && &d.size == size_name)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => wanted.push(StockDecrement {
                    product: product.id,
                    size: size_name.clone(),
                    quantity: item.quantity,
                }),
            }
        }

        items.push(LineItem {
            product: product.id,
            name: product.name.clone(),
            price: product.price,
            size,
            quantity: item.quantity,
            image: product.main_image().map(str::to_owned),
        });
    }

    for decrement in &wanted {
        let available = products
            .get(&decrement.product)
            .and_then(|p| p.size(&decrement.size))
            .map(|s| s.stock);
        if available.is_none_or(|stock| stock < decrement.quantity) {
            let product = products
                .get(&decrement.product)
                .map_or_else(String::new, |p| p.name.clone());
            return Err(OrderError::InsufficientStock {
                product,
                size: decrement.size.clone(),
            });
        }
    }

    Ok((items, wanted))
}
