use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    products::{dto::ProductInput, repo_types::Product},
    state::AppState,
    transactions::repo_types::TransactionFilter,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list().await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    state
        .products
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    auth.require_admin()?;
    let product = body.into_product(Uuid::new_v4())?;
    state.products.create(&product).await?;
    info!(product_id = %product.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    auth.require_admin()?;
    let product = body.into_product(id)?;
    if !state.products.update(&product).await? {
        return Err(AppError::NotFound("product"));
    }
    info!(product_id = %id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state), fields(admin = %auth.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    let in_use = TransactionFilter {
        product: Some(id),
        invalid: Some(false),
        ..Default::default()
    };
    if state.transactions.exists(in_use).await? {
        return Err(AppError::Conflict("product is part of valid transactions".into()));
    }
    if !state.products.delete(id).await? {
        return Err(AppError::NotFound("product"));
    }
    info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
