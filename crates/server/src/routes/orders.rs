//! Order route handlers.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use mp_records_core::{OrderId, OrderStatus};

use crate::db::OrderFilter;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path, Query};
use crate::middleware::{OptionalCustomer, RequireAdmin, RequireCustomer};
use crate::models::OrderUpdate;
use crate::routes::ApiResponse;
use crate::services::orders::{PlaceOrder, place_order};
use crate::state::AppState;

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/mine", get(mine))
        .route("/admin", get(admin_index))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Admin listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

/// POST /api/orders
///
/// Open to guests; a customer token links the order to the account and
/// empties its cart.
#[instrument(skip_all)]
pub async fn create(
    OptionalCustomer(customer): OptionalCustomer,
    State(state): State<AppState>,
    Json(request): Json<PlaceOrder>,
) -> Result<impl IntoResponse> {
    let order = place_order(state.store(), request, customer.map(|c| c.id)).await?;
    add_breadcrumb(
        "order",
        "Order placed",
        Some(&[("order_number", order.number.as_str())]),
    );
    Ok(ApiResponse::created(order, "Order placed"))
}

/// GET /api/orders/mine
pub async fn mine(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let orders = state
        .store()
        .list_orders(OrderFilter {
            customer: Some(customer.id),
            ..OrderFilter::default()
        })
        .await?;
    Ok(ApiResponse::list(orders))
}

/// GET /api/orders/admin
pub async fn admin_index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse> {
    let orders = state
        .store()
        .list_orders(OrderFilter {
            status: query.status,
            ..OrderFilter::default()
        })
        .await?;
    Ok(ApiResponse::list(orders))
}

/// GET /api/orders/{id}
pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = state
        .store()
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    Ok(ApiResponse::data(order))
}

/// PUT /api/orders/{id}
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<OrderUpdate>,
) -> Result<impl IntoResponse> {
    let mut order = state
        .store()
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    update.apply_to(&mut order, Utc::now());
    state.store().update_order(&order).await?;
    tracing::info!(
        order_number = %order.number,
        status = %order.status,
        payment_status = %order.payment_status,
        "order updated"
    );
    Ok(ApiResponse::data(order))
}

/// DELETE /api/orders/{id}
#[instrument(skip_all, fields(order_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    state.store().delete_order(id).await?;
    Ok(ApiResponse::message("Order deleted"))
}
