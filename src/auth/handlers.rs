use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicAccount, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        password::verify_password,
        repo_types::{Account, Role},
        services::{create_account, is_valid_email, normalize_email, JwtKeys},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, account: Account) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(account.id, account.role).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Store(e)
    })?;
    let refresh_token = keys.sign_refresh(account.id, account.role).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Store(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        account: account.into(),
    })
}

/// Admin creates a cashier account.
#[instrument(skip(state, payload), fields(admin = %auth.id))]
pub async fn register(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicAccount>), AppError> {
    auth.require_admin()?;
    let account = create_account(
        state.accounts.as_ref(),
        &payload.email,
        &payload.password,
        Role::Cashier,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let account = match state.accounts.find_by_email(&email).await? {
        Some(a) => a,
        None => {
            warn!(%email, "login unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(%email, account_id = %account.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(account_id = %account.id, %email, "cashier logged in");
    Ok(Json(issue_tokens(&state, account)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    // Role may have changed since the token was issued
    let account = state
        .accounts
        .get(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account not found".into()))?;

    Ok(Json(issue_tokens(&state, account)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicAccount>, AppError> {
    let account = state.accounts.get(auth.id).await?.ok_or_else(|| {
        error!(account_id = %auth.id, "account not found");
        AppError::Unauthorized("Account not found".into())
    })?;
    Ok(Json(account.into()))
}
