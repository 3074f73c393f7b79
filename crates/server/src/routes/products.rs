//! Shop product route handlers.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use mp_records_core::{ProductCategory, ProductId};

use crate::db::ProductFilter;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductDraft, ProductView};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/admin", get(admin_index))
        .route("/{id}", get(show).put(update).delete(destroy))
}

/// Query parameters for the public listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<ProductCategory>,
}

fn views(products: Vec<Product>) -> Vec<ProductView> {
    products.into_iter().map(ProductView::from).collect()
}

/// GET /api/products
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let products = state
        .store()
        .list_products(ProductFilter {
            active_only: true,
            category: query.category,
        })
        .await?;
    Ok(ApiResponse::list(views(products)))
}

/// GET /api/products/admin
pub async fn admin_index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let products = state.store().list_products(ProductFilter::default()).await?;
    Ok(ApiResponse::list(views(products)))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = find(&state, id).await?;
    Ok(ApiResponse::data(ProductView::from(product)))
}

/// POST /api/products
#[instrument(skip_all)]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse> {
    let product = draft.into_product(Utc::now())?;
    state.store().insert_product(&product).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    Ok(ApiResponse::created(ProductView::from(product), "Product created"))
}

/// PUT /api/products/{id}
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse> {
    let mut product = find(&state, id).await?;
    draft.apply_to(&mut product, Utc::now())?;
    state.store().update_product(&product).await?;
    Ok(ApiResponse::data(ProductView::from(product)))
}

/// DELETE /api/products/{id}
#[instrument(skip_all, fields(product_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    state.store().delete_product(id).await?;
    add_breadcrumb("product", "Deleted product", Some(&[("id", &id.to_string())]));
    Ok(ApiResponse::message("Product deleted"))
}

async fn find(state: &AppState, id: ProductId) -> Result<Product> {
    state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}
