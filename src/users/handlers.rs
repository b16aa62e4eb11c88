use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    transactions::{dto::UserStats, repo_types::TransactionFilter},
    users::{
        dto::{status_index, DepositRequest, StatusInput, UserInput, UserResponse},
        repo_types::Status,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/stats", get(user_stats))
        .route("/statuses", get(list_statuses))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/users/:id/deposit", post(deposit))
        .route("/statuses", post(create_status))
        .route("/statuses/:id", put(update_status).delete(delete_status))
}

/// Users with their full names and resolved statuses.
pub async fn load_users(state: &AppState) -> Result<Vec<UserResponse>, AppError> {
    let statuses = status_index(state.users.list_statuses().await?);
    let users = state.users.list().await?;
    Ok(users
        .into_iter()
        .map(|u| UserResponse::new(u, &statuses))
        .collect())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(load_users(&state).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get(id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let statuses = status_index(state.users.list_statuses().await?);
    Ok(Json(UserResponse::new(user, &statuses)))
}

#[instrument(skip(state))]
pub async fn user_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserStats>, AppError> {
    Ok(Json(state.transactions.user_stats(id).await?))
}

#[instrument(skip(state))]
pub async fn list_statuses(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Status>>, AppError> {
    Ok(Json(state.users.list_statuses().await?))
}

/// Status index for the response, after checking the referenced status exists.
async fn statuses_with(
    state: &AppState,
    status: Option<Uuid>,
) -> Result<HashMap<Uuid, Status>, AppError> {
    let statuses = status_index(state.users.list_statuses().await?);
    match status {
        Some(id) if !statuses.contains_key(&id) => {
            Err(AppError::Validation(format!("unknown status {id}")))
        }
        _ => Ok(statuses),
    }
}

async fn user_response(state: &AppState, id: Uuid) -> Result<UserResponse, AppError> {
    let user = state
        .users
        .get(id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let statuses = status_index(state.users.list_statuses().await?);
    Ok(UserResponse::new(user, &statuses))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UserInput>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    auth.require_admin()?;
    let user = body.into_user(Uuid::new_v4(), Decimal::ZERO)?;
    let statuses = statuses_with(&state, user.status_id).await?;
    state.users.create(&user).await?;
    info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::new(user, &statuses))))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UserInput>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_admin()?;
    let user = body.into_user(id, Decimal::ZERO)?;
    statuses_with(&state, user.status_id).await?;
    if !state.users.update(&user).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(user_id = %id, "user updated");
    Ok(Json(user_response(&state, id).await?))
}

/// Users with valid transactions stay; voiding those needs the user record.
#[instrument(skip(state), fields(admin = %auth.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    if state.transactions.exists(TransactionFilter::for_user(id)).await? {
        return Err(AppError::Conflict("user has valid transactions".into()));
    }
    if !state.users.delete(id).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DepositRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_admin()?;
    if body.amount.is_zero() {
        return Err(AppError::Validation("amount must not be zero".into()));
    }
    if state.users.get(id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    state.users.increment_balance(id, body.amount).await?;
    info!(user_id = %id, amount = %body.amount, "balance deposit");
    Ok(Json(user_response(&state, id).await?))
}

async fn ensure_unique_status_name(state: &AppState, status: &Status) -> Result<(), AppError> {
    let taken = state
        .users
        .list_statuses()
        .await?
        .into_iter()
        .any(|s| s.name == status.name && s.id != status.id);
    if taken {
        return Err(AppError::Conflict(format!("status {} already exists", status.name)));
    }
    Ok(())
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn create_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StatusInput>,
) -> Result<(StatusCode, Json<Status>), AppError> {
    auth.require_admin()?;
    let status = body.into_status(Uuid::new_v4())?;
    ensure_unique_status_name(&state, &status).await?;
    state.users.create_status(&status).await?;
    info!(status_id = %status.id, name = %status.name, "status created");
    Ok((StatusCode::CREATED, Json(status)))
}

#[instrument(skip(state, body), fields(admin = %auth.id))]
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusInput>,
) -> Result<Json<Status>, AppError> {
    auth.require_admin()?;
    let status = body.into_status(id)?;
    ensure_unique_status_name(&state, &status).await?;
    if !state.users.update_status(&status).await? {
        return Err(AppError::NotFound("status"));
    }
    Ok(Json(status))
}

#[instrument(skip(state), fields(admin = %auth.id))]
pub async fn delete_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    if !state.users.delete_status(id).await? {
        return Err(AppError::NotFound("status"));
    }
    info!(status_id = %id, "status deleted");
    Ok(StatusCode::NO_CONTENT)
}
