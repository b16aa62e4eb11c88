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
    paytypes::{dto::PaytypeInput, repo_types::Paytype},
    state::AppState,
    transactions::repo_types::TransactionFilter,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/paytypes", get(list_paytypes))
        .route("/paytypes/:id", get(get_paytype))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/paytypes", post(create_paytype))
        .route("/paytypes/:id", put(update_paytype).delete(delete_paytype))
}

#[instrument(skip(state))]
pub async fn list_paytypes(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Paytype>>, AppError> {
    Ok(Json(state.paytypes.list().await?))
}

#[instrument(skip(state))]
pub async fn get_paytype(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Paytype>, AppError> {
    state
        .paytypes
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("paytype"))
}

async fn ensure_statuses_exist(state: &AppState, paytype: &Paytype) -> Result<(), AppError> {
    let known = state.users.list_statuses().await?;
    match paytype
        .allowed_statuses
        .iter()
        .find(|id| !known.iter().any(|s| s.id == **id))
    {
        Some(id) => Err(AppError::Validation(format!("unknown status {id}"))),
        None => Ok(()),
    }
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn create_paytype(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PaytypeInput>,
) -> Result<(StatusCode, Json<Paytype>), AppError> {
    auth.require_admin()?;
    let paytype = body.into_paytype(Uuid::new_v4())?;
    ensure_statuses_exist(&state, &paytype).await?;
    state.paytypes.create(&paytype).await?;
    info!(paytype_id = %paytype.id, name = %paytype.name, "paytype created");
    Ok((StatusCode::CREATED, Json(paytype)))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn update_paytype(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PaytypeInput>,
) -> Result<Json<Paytype>, AppError> {
    auth.require_admin()?;
    let paytype = body.into_paytype(id)?;
    ensure_statuses_exist(&state, &paytype).await?;
    if !state.paytypes.update(&paytype).await? {
        return Err(AppError::NotFound("paytype"));
    }
    info!(paytype_id = %id, "paytype updated");
    Ok(Json(paytype))
}

#[instrument(skip(state), fields(admin = %auth.id))]
pub async fn delete_paytype(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    let in_use = TransactionFilter {
        paytype: Some(id),
        invalid: Some(false),
        ..Default::default()
    };
    if state.transactions.exists(in_use).await? {
        return Err(AppError::Conflict("pay type is used by valid transactions".into()));
    }
    if !state.paytypes.delete(id).await? {
        return Err(AppError::NotFound("paytype"));
    }
    info!(paytype_id = %id, "paytype deleted");
    Ok(StatusCode::NO_CONTENT)
}
