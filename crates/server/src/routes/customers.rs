//! Shop customer route handlers: registration, login, profile and cart.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use mp_records_core::ProductId;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireCustomer;
use crate::models::{Customer, CustomerDraft, ProductView};
use crate::routes::ApiResponse;
use crate::services::auth::Registration;
use crate::state::AppState;

/// Build the customer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile).put(update_profile))
        .route("/cart", get(cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{index}", put(update_cart_item).delete(remove_cart_item))
}

/// Registration form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Customer login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Cart line quantity change. Zero or less removes the line.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub quantity: i64,
}

/// A cart line joined with the product's current data.
///
/// `product` is `None` when the product has since been deleted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub index: usize,
    pub product_id: ProductId,
    pub product: Option<ProductView>,
    pub size: Option<String>,
    pub quantity: u32,
}

/// POST /api/customers/register
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse> {
    let (token, customer) = state
        .auth()
        .register_customer(Registration {
            email: form.email,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
            phone: form.phone,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "token": token, "customer": customer })),
    ))
}

/// POST /api/customers/login
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse> {
    let (token, customer) = state
        .auth()
        .login_customer(&form.email, &form.password)
        .await?;
    Ok(Json(
        json!({ "success": true, "token": token, "customer": customer }),
    ))
}

/// GET /api/customers/profile
pub async fn profile(RequireCustomer(customer): RequireCustomer) -> impl IntoResponse {
    ApiResponse::data(customer)
}

/// PUT /api/customers/profile
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn update_profile(
    RequireCustomer(mut customer): RequireCustomer,
    State(state): State<AppState>,
    Json(draft): Json<CustomerDraft>,
) -> Result<impl IntoResponse> {
    draft.apply_to(&mut customer, Utc::now())?;
    state.store().update_customer(&customer).await?;
    Ok(ApiResponse::data(customer))
}

/// GET /api/customers/cart
pub async fn cart(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::list(cart_lines(&state, &customer).await?))
}

/// POST /api/customers/cart
#[instrument(skip_all, fields(customer_id = %customer.id, product_id = %form.product_id))]
pub async fn add_to_cart(
    RequireCustomer(mut customer): RequireCustomer,
    State(state): State<AppState>,
    Json(form): Json<AddToCartForm>,
) -> Result<impl IntoResponse> {
    if state.store().get_product(form.product_id).await?.is_none() {
        return Err(AppError::NotFound("Product".to_string()));
    }
    customer.add_to_cart(form.product_id, form.size, form.quantity);
    save_cart(&state, &customer).await
}

/// PUT /api/customers/cart/{index}
pub async fn update_cart_item(
    RequireCustomer(mut customer): RequireCustomer,
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(form): Json<QuantityForm>,
) -> Result<impl IntoResponse> {
    let quantity = u32::try_from(form.quantity.max(0)).unwrap_or(u32::MAX);
    customer.set_cart_quantity(index, quantity)?;
    save_cart(&state, &customer).await
}

/// DELETE /api/customers/cart/{index}
pub async fn remove_cart_item(
    RequireCustomer(mut customer): RequireCustomer,
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse> {
    customer.remove_from_cart(index)?;
    save_cart(&state, &customer).await
}

/// DELETE /api/customers/cart
pub async fn clear_cart(
    RequireCustomer(mut customer): RequireCustomer,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    customer.cart.clear();
    save_cart(&state, &customer).await
}

async fn save_cart(
    state: &AppState,
    customer: &Customer,
) -> Result<axum::Json<ApiResponse<Vec<CartLine>>>> {
    state.store().set_cart(customer.id, &customer.cart).await?;
    Ok(ApiResponse::list(cart_lines(state, customer).await?))
}

async fn cart_lines(state: &AppState, customer: &Customer) -> Result<Vec<CartLine>> {
    let mut lines = Vec::with_capacity(customer.cart.len());
    for (index, item) in customer.cart.iter().enumerate() {
        let product = state.store().get_product(item.product).await?;
        lines.push(CartLine {
            index,
            product_id: item.product,
            product: product.map(ProductView::from),
            size: item.size.clone(),
            quantity: item.quantity,
        });
    }
    Ok(lines)
}
