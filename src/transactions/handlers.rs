use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    transactions::{
        dto::{PayRequest, PaymentResponse, RemovedResponse, TransactionView},
        repo_types::TransactionFilter,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/:id", get(get_transaction))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(pay).delete(remove_all))
        .route("/transactions/:id/invalid", post(invalidate))
}

#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<TransactionView>>, AppError> {
    let items = state.transactions.get_with_filter(&filter).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, AppError> {
    state
        .transactions
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("transaction"))
}

/// POST /transactions { user, paytype, products: [{ product, quantity }] }
#[instrument(skip(state, body), fields(cashier = %auth.id))]
pub async fn pay(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PayRequest>,
) -> Result<(StatusCode, HeaderMap, Json<PaymentResponse>), AppError> {
    let paid = state.transactions.pay(body).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/transactions/{}", paid.id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(paid)))
}

#[instrument(skip(state), fields(cashier = %auth.id))]
pub async fn invalidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, AppError> {
    let view = state.transactions.invalidate(id).await?;
    Ok(Json(view))
}

#[instrument(skip(state), fields(admin = %auth.id))]
pub async fn remove_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<RemovedResponse>, AppError> {
    auth.require_admin()?;
    let removed = state.transactions.remove().await?;
    info!(removed, "transactions reset");
    Ok(Json(RemovedResponse { removed }))
}
